// Shared transport configuration for building reqwest::Client instances.
//
// Every QueryApi request (discovery, poll, command) goes through one
// client built from this config, so the timeout and TLS posture are
// uniform across the gateway.

use std::time::Duration;

use crate::error::ApiError;

/// Fixed request timeout for all QueryApi calls.
///
/// The controller answers well under a second on a LAN; anything slower
/// is treated as a transport failure and handled by the poll/discovery
/// retry rules.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared transport configuration for the QueryApi HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout. Applies to discovery, polling, and commands.
    pub timeout: Duration,
    /// Accept self-signed certificates. Local myGekko units serve a
    /// self-signed cert, so this defaults to `true`.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("gekkoly/", env!("CARGO_PKG_VERSION")));

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(ApiError::Transport)
    }
}
