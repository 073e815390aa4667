use thiserror::Error;

/// Top-level error type for the `gekkoly-api` crate.
///
/// Covers every failure mode of the QueryApi surface: transport,
/// non-200 responses, and body deserialization. `gekkoly-core` maps
/// these into consumer-facing status texts.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The QueryApi answered with a non-200 status.
    #[error("{}", status_message(*.status))]
    Status { status: u16 },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl ApiError {
    /// Returns `true` if this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status } => matches!(status, 410 | 429 | 444),
            _ => false,
        }
    }
}

/// Human-readable message for a QueryApi status code.
///
/// The texts mirror what the controller documentation names for each
/// code; unknown codes degrade to a generic message.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "400 - Bad Request - Syntax".into(),
        403 => "403 - Forbidden - False Credentials".into(),
        404 => "404 - Ressource not found".into(),
        405 => "405 - Method not allowed".into(),
        410 => "410 - Gone - Gekko offline or false Gekko ID".into(),
        429 => "429 - Too many requests".into(),
        444 => "444 - No Response".into(),
        other => format!("{other} - unknown Error"),
    }
}
