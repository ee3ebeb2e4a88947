//! Error taxonomy for the award and ranking engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurioError>;

#[derive(Debug, Error)]
pub enum CurioError {
    #[error("Unknown event kind: {0}")]
    InvalidEventKind(String),

    #[error("Missing context for {kind}: {field} is required")]
    MissingContext { kind: String, field: &'static str },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Circle {circle_id} is full ({cap} members)")]
    CircleFull { circle_id: String, cap: u32 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl CurioError {
    /// Whether a caller may retry the same request (with the same idempotency key).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for CurioError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CurioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unavailable(format!("metadata encoding: {err}"))
    }
}
