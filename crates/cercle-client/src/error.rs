use serde_json::Value;
use thiserror::Error;

/// Structured failure from a remote API call.
///
/// `status` is the HTTP status code; 0 means the request never produced a
/// response (connect failure, timeout, DNS). `details` carries the parsed
/// error body when the backend returned JSON.
#[derive(Debug, Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn network(err: &reqwest::Error) -> Self {
        Self {
            message: format!("network error or server unavailable: {}", err),
            status: 0,
            details: None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }

    /// 4xx responses: the backend understood the request and refused it,
    /// typically a policy decision.
    pub fn is_rejection(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
