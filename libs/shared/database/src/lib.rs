pub mod cache;
pub mod drchrono;
pub mod sync;

pub use cache::{Database, DbError, DbResult};
pub use drchrono::DrChronoClient;
