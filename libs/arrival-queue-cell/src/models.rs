use serde::Serialize;

pub const POLL_FAILED: &str = "Failed to poll";

/// Body of `POST /poll_for_updates/`. Failures never surface as an HTTP error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PollResponse {
    Success { updates: Vec<String> },
    Fail { message: String },
}

impl PollResponse {
    pub fn failed() -> Self {
        PollResponse::Fail { message: POLL_FAILED.to_string() }
    }
}
