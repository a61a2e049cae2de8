/// Prefix an oracle reply carries when it reports an upstream failure
/// instead of content.
pub const AI_ERROR_PREFIX: &str = "AI_ERROR";

/// Errors returned by the catalog and cart collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No credential is available; the user never logged in.
    #[error("user not logged in")]
    NotAuthenticated,

    /// The credential was rejected (HTTP 401). Triggers the session-expired event.
    #[error("session expired")]
    Unauthorized,

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, timeout or runtime failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the failure means the session is over and the user must
    /// log in again.
    pub fn is_session_expiry(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Errors returned by the generative-text oracle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle answered with the error sentinel or the call failed.
    #[error("AI_ERROR: {0}")]
    Upstream(String),

    /// No oracle is configured.
    #[error("assistant is not configured")]
    Unavailable,

    /// The oracle answered with nothing usable.
    #[error("assistant returned no content")]
    Blank,
}

/// A catalog fixture that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("invalid catalog fixture: {0}")]
    Invalid(#[from] serde_json::Error),
}
