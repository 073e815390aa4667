use std::time::Duration;

use gekkoly_api::{Credentials, transport};
use secrecy::SecretString;
use url::Url;

/// Runtime configuration for one gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Controller base URL, e.g. `http://192.168.1.10` for local access
    /// or `https://live.my-gekko.com` for the cloud relay.
    pub base_url: Url,
    pub credentials: Credentials,
    /// Delay between the end of one poll cycle and the start of the
    /// next; the effective period also includes request latency.
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Delay between discovery attempts while the controller is
    /// unreachable. Discovery retries forever.
    pub discovery_retry_delay: Duration,
    /// Delay between `register_when_ready` attempts.
    pub registration_retry_delay: Duration,
    /// Controllers ship self-signed certificates on the local network.
    pub accept_invalid_certs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://192.168.1.10").expect("literal URL parses"),
            credentials: Credentials::Local {
                username: "admin".to_owned(),
                password: SecretString::from(""),
            },
            poll_interval: Duration::from_secs(5),
            request_timeout: transport::REQUEST_TIMEOUT,
            discovery_retry_delay: Duration::from_secs(2),
            registration_retry_delay: Duration::from_millis(2500),
            accept_invalid_certs: true,
        }
    }
}
