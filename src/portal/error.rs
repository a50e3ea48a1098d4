use thiserror::Error;

use crate::browser::page::PageError;

/// Failure taxonomy of one refresh run. Parse degradation is not here:
/// malformed CSV rows are dropped and counted, never raised.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Request rejected before any browser side effect.
    #[error("invalid input: {0}")]
    Input(String),

    /// Storage-state snapshot absent or unreadable while `use_storage` was set.
    #[error("saved session unavailable: {0}")]
    SessionUnavailable(String),

    /// Bot-verification wall detected. Permanent until a human intervenes.
    #[error("verification challenge: {0}")]
    VerificationChallenge(String),

    /// Login page persisted after a submit attempt.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A required control matched no selector candidate.
    #[error("control not found: {0}")]
    ControlNotFound(String),

    /// A download control was clicked but no file event fired.
    #[error("download not captured: {0}")]
    DownloadNotCaptured(String),

    #[error("timed out during {step}: {detail}")]
    Timeout { step: String, detail: String },

    #[error("browser error: {0}")]
    Browser(#[from] PageError),
}

impl SessionError {
    pub fn timeout(step: &str, detail: impl Into<String>) -> Self {
        Self::Timeout {
            step: step.to_string(),
            detail: detail.into(),
        }
    }
}
