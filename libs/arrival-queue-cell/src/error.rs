use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ArrivalQueueError {
    #[error("Could not resolve the polling doctor: {0}")]
    Session(#[source] AppError),

    #[error("Arrival store error: {0}")]
    Store(#[from] DbError),
}
