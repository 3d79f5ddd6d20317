use thiserror::Error;

/// Domain error taxonomy (§7). Variants are grouped by the kind they map to;
/// the HTTP layer (`nanorelay-server`) is the only place that turns a kind
/// into a status code.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ── Validation ───────────────────────────────────────────────────────────
    #[error("{0}")]
    Validation(String),

    // ── NotFound ─────────────────────────────────────────────────────────────
    #[error("Invalid payment id")]
    NotFound,

    // ── Conflict ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Conflict(String),

    // ── Upstream ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Upstream(String),

    // ── Timeout ──────────────────────────────────────────────────────────────
    #[error("timed out waiting for settlement")]
    Timeout,

    // ── Internal ─────────────────────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<rusqlite::Error> for PaymentError {
    fn from(e: rusqlite::Error) -> Self {
        PaymentError::Internal(e.to_string())
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        PaymentError::Upstream(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PaymentError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        PaymentError::Upstream(e.to_string())
    }
}
