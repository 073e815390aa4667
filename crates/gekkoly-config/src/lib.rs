//! Configuration for gekkoly gateways.
//!
//! TOML profiles, credential resolution (env + plaintext), and
//! translation to `gekkoly_core::GatewayConfig`. One profile per
//! controller; a profile selects local or cloud access mode.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gekkoly_api::Credentials;
use gekkoly_core::GatewayConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("no profile named '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when no name is given.
    pub default_profile: Option<String>,

    /// Global defaults, overridable per profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed controller certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            insecure: default_insecure(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}
fn default_timeout() -> u64 {
    2
}
fn default_insecure() -> bool {
    // Local controllers serve self-signed certificates.
    true
}

/// A named controller profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL, e.g. "http://192.168.1.10" for local mode
    /// or "https://live.my-gekko.com" for cloud mode.
    pub controller: String,

    /// Access mode: "local" or "cloud".
    #[serde(default = "default_mode")]
    pub mode: String,

    pub username: Option<String>,

    /// Password for local mode (plaintext — prefer the env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// API key for cloud mode (plaintext — prefer the env var).
    pub key: Option<String>,

    /// Environment variable name containing the API key.
    pub key_env: Option<String>,

    /// Controller id for cloud mode.
    pub gekko_id: Option<String>,

    /// Override the insecure TLS default.
    pub insecure: Option<bool>,

    /// Override the poll interval, in seconds.
    pub poll_interval: Option<u64>,

    /// Override the request timeout, in seconds.
    pub timeout: Option<u64>,
}

fn default_mode() -> String {
    "local".into()
}

/// Select a profile by name, falling back to `default_profile`.
pub fn select_profile<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let name = name
        .or(config.default_profile.as_deref())
        .unwrap_or("default");
    config
        .profiles
        .get_key_value(name)
        .map(|(n, p)| (n.as_str(), p))
        .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "gekkoly", "gekkoly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gekkoly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from an explicit file + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GEKKO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

/// Serialize config to TOML and write to an explicit path.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve credentials from a profile.
///
/// Secrets follow the chain: profile-named env var, then the generic
/// `GEKKO_PASSWORD` / `GEKKO_KEY` env var, then plaintext in the
/// config file.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("GEKKO_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    match profile.mode.as_str() {
        "local" => {
            let password =
                resolve_secret(profile.password_env.as_deref(), "GEKKO_PASSWORD", profile.password.as_deref())
                    .ok_or_else(|| ConfigError::NoCredentials {
                        profile: profile_name.into(),
                    })?;
            Ok(Credentials::Local { username, password })
        }
        "cloud" => {
            let key = resolve_secret(profile.key_env.as_deref(), "GEKKO_KEY", profile.key.as_deref())
                .ok_or_else(|| ConfigError::NoCredentials {
                    profile: profile_name.into(),
                })?;
            let gekko_id = profile
                .gekko_id
                .clone()
                .or_else(|| std::env::var("GEKKO_ID").ok())
                .ok_or_else(|| ConfigError::Validation {
                    field: "gekko_id".into(),
                    reason: "required in cloud mode".into(),
                })?;
            Ok(Credentials::Cloud {
                username,
                key,
                gekko_id,
            })
        }
        other => Err(ConfigError::Validation {
            field: "mode".into(),
            reason: format!("expected 'local' or 'cloud', got '{other}'"),
        }),
    }
}

fn resolve_secret(
    env_name: Option<&str>,
    generic_env: &str,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            return Some(SecretString::from(val));
        }
    }
    if let Ok(val) = std::env::var(generic_env) {
        return Some(SecretString::from(val));
    }
    plaintext.map(SecretString::from)
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    let base_url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    let credentials = resolve_credentials(profile, profile_name)?;

    Ok(GatewayConfig {
        base_url,
        credentials,
        poll_interval: Duration::from_secs(
            profile.poll_interval.unwrap_or(defaults.poll_interval),
        ),
        request_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        accept_invalid_certs: profile.insecure.unwrap_or(defaults.insecure),
        ..GatewayConfig::default()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_profiles_with_defaults_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
                default_profile = "home"

                [profiles.home]
                controller = "http://192.168.1.10"
                username = "admin"
                password = "secret"
            "#,
        );

        let config = load_config_from(&path).unwrap();
        let (name, profile) = select_profile(&config, None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.mode, "local");
        assert_eq!(config.defaults.poll_interval, 5);
        assert_eq!(config.defaults.timeout, 2);
        assert!(config.defaults.insecure);
    }

    #[test]
    fn saved_config_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut profiles = HashMap::new();
        profiles.insert(
            "home".to_owned(),
            Profile {
                controller: "http://192.168.1.10".into(),
                mode: "local".into(),
                username: Some("admin".into()),
                password: Some("pw".into()),
                password_env: None,
                key: None,
                key_env: None,
                gekko_id: None,
                insecure: Some(false),
                poll_interval: Some(10),
                timeout: None,
            },
        );
        let config = Config {
            default_profile: Some("home".into()),
            defaults: Defaults::default(),
            profiles,
        };

        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let (name, profile) = select_profile(&loaded, None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.controller, "http://192.168.1.10");
        assert_eq!(profile.insecure, Some(false));
        assert_eq!(profile.poll_interval, Some(10));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = Config::default();
        let err = select_profile(&config, Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn local_profile_resolves_plaintext_password() {
        let profile = Profile {
            controller: "http://192.168.1.10".into(),
            mode: "local".into(),
            username: Some("admin".into()),
            password: Some("secret".into()),
            password_env: None,
            key: None,
            key_env: None,
            gekko_id: None,
            insecure: None,
            poll_interval: None,
            timeout: None,
        };
        let creds = resolve_credentials(&profile, "home").unwrap();
        assert!(matches!(creds, Credentials::Local { username, .. } if username == "admin"));
    }

    #[test]
    fn cloud_profile_requires_gekko_id() {
        let profile = Profile {
            controller: "https://live.my-gekko.com".into(),
            mode: "cloud".into(),
            username: Some("user".into()),
            password: None,
            password_env: None,
            key: Some("apikey".into()),
            key_env: None,
            gekko_id: None,
            insecure: None,
            poll_interval: None,
            timeout: None,
        };
        let err = resolve_credentials(&profile, "plus").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "gekko_id"));
    }

    #[test]
    fn named_env_var_wins_over_plaintext() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HOME_GEKKO_PW", "from-env");
            let profile = Profile {
                controller: "http://192.168.1.10".into(),
                mode: "local".into(),
                username: Some("admin".into()),
                password: Some("plaintext".into()),
                password_env: Some("HOME_GEKKO_PW".into()),
                key: None,
                key_env: None,
                gekko_id: None,
                insecure: None,
                poll_interval: None,
                timeout: None,
            };
            let creds = resolve_credentials(&profile, "home").expect("resolves");
            let Credentials::Local { password, .. } = creds else {
                panic!("expected local credentials");
            };
            use secrecy::ExposeSecret;
            assert_eq!(password.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let profile = Profile {
            controller: "http://192.168.1.10".into(),
            mode: "proxy".into(),
            username: Some("admin".into()),
            password: Some("pw".into()),
            password_env: None,
            key: None,
            key_env: None,
            gekko_id: None,
            insecure: None,
            poll_interval: None,
            timeout: None,
        };
        let err = resolve_credentials(&profile, "home").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "mode"));
    }

    #[test]
    fn profile_overrides_beat_defaults_in_gateway_config() {
        let profile = Profile {
            controller: "http://192.168.1.10".into(),
            mode: "local".into(),
            username: Some("admin".into()),
            password: Some("pw".into()),
            password_env: None,
            key: None,
            key_env: None,
            gekko_id: None,
            insecure: Some(false),
            poll_interval: Some(10),
            timeout: Some(4),
        };
        let config = profile_to_gateway_config(&profile, "home", &Defaults::default()).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(4));
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.base_url.as_str(), "http://192.168.1.10/");
    }

    #[test]
    fn invalid_controller_url_is_rejected() {
        let profile = Profile {
            controller: "not a url".into(),
            mode: "local".into(),
            username: Some("admin".into()),
            password: Some("pw".into()),
            password_env: None,
            key: None,
            key_env: None,
            gekko_id: None,
            insecure: None,
            poll_interval: None,
            timeout: None,
        };
        let err = profile_to_gateway_config(&profile, "home", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "controller"));
    }
}
