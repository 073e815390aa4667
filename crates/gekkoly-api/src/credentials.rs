// ── QueryApi credential composition ──
//
// The QueryApi authenticates via query-string parameters, not headers.
// Two modes exist: direct LAN access (username + password) and the
// plus/cloud relay (username + API key + gekko id). Secrets are held
// in `SecretString` so they never land in Debug output or logs.

use secrecy::{ExposeSecret, SecretString};
use url::form_urlencoded;

/// Credentials for the myGekko QueryApi, selected by configuration.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Direct access to a controller on the local network.
    Local {
        username: String,
        password: SecretString,
    },
    /// Access through the myGekko plus cloud relay.
    Cloud {
        username: String,
        key: SecretString,
        gekko_id: String,
    },
}

impl Credentials {
    /// Render the credential query suffix, values percent-encoded.
    ///
    /// Appended to every request URL: `username=...&password=...` for
    /// local mode, `username=...&key=...&gekkoid=...` for cloud mode.
    pub fn query_suffix(&self) -> String {
        match self {
            Self::Local { username, password } => {
                form_urlencoded::Serializer::new(String::new())
                    .append_pair("username", username)
                    .append_pair("password", password.expose_secret())
                    .finish()
            }
            Self::Cloud {
                username,
                key,
                gekko_id,
            } => form_urlencoded::Serializer::new(String::new())
                .append_pair("username", username)
                .append_pair("key", key.expose_secret())
                .append_pair("gekkoid", gekko_id)
                .finish(),
        }
    }
}
