// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;
use url::Url;

/// Prefix of environment variables overriding the file, e.g. `CLOUDLIVE_API__KEY`.
pub const ENV_PREFIX: &str = "CLOUDLIVE_";

/// Settings read verbatim from the environment. `Env` parses `0042` as the integer 42.
const STRING_KEYS: &[&str] =
    &["api.base_url", "api.version", "api.key", "api.access_key", "workflow.preset", "data.dir"];

/// `api.access_key` -> `CLOUDLIVE_API__ACCESS_KEY`
fn env_var_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace('.', "__").to_uppercase())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("No {0} specified in configuration")]
    Missing(&'static str),

    #[error("api.base_url must be an http(s) URL, got: {0}")]
    InvalidUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Remote API location and credentials.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    /// Sent as the `wsc-api-key` header.
    pub key: String,
    /// Sent as the `wsc-access-key` header.
    pub access_key: String,
    /// Print status and headers of every response.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloud.wowza.com".to_string(),
            version: "v1".to_string(),
            key: String::new(),
            access_key: String::new(),
            debug: false,
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

/// HTTP client behaviour.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout covering connect, send and body read (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Show a spinner on stderr while a request is in flight (default: true)
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs(), progress: true }
    }
}

impl HttpConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_poll_interval_secs() -> u64 {
    10
}

fn default_preset() -> String {
    "other_rtsp_pull".to_string()
}

/// Guided workflow settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorkflowConfig {
    /// Wait between two state queries while a resource is provisioning (default: 10)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Encoder preset (file stem under `live_stream/encoder_types`) used as create body
    #[serde(default = "default_preset")]
    pub preset: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { poll_interval_secs: default_poll_interval_secs(), preset: default_preset() }
    }
}

impl WorkflowConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

/// Location of the example request bodies.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { dir: default_data_dir() }
    }
}

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Root configuration of the client.
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Checks that every value required to talk to the API is present.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Missing("api.base_url"));
        }
        match Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {},
            _ => return Err(ConfigError::InvalidUrl(base_url.to_string())),
        }
        if self.api.version.trim().is_empty() {
            return Err(ConfigError::Missing("api.version"));
        }
        if self.api.key.trim().is_empty() {
            return Err(ConfigError::Missing("api.key"));
        }
        if self.api.access_key.trim().is_empty() {
            return Err(ConfigError::Missing("api.access_key"));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Zero("http.timeout_secs"));
        }
        if self.workflow.poll_interval_secs == 0 {
            return Err(ConfigError::Zero("workflow.poll_interval_secs"));
        }
        Ok(())
    }

    /// Level the console logger starts at; `api.debug` raises it to debug.
    pub fn effective_log_level(&self) -> Level {
        if self.api.debug {
            Level::DEBUG
        } else {
            self.log.level.into()
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub file_missing: Option<String>,
}

/// Loads the configuration from defaults, a TOML file, and `CLOUDLIVE_` environment variables.
///
/// A missing file is not an error since every value may come from the environment; the
/// path is reported back in `file_missing` instead.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file exists but contains invalid TOML syntax
/// - Environment variables are set but contain invalid values
pub fn load(config_path: &str) -> Result<ConfigLoadResult, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    let mut file_missing = None;

    if std::path::Path::new(config_path).exists() {
        figment = figment.merge(Toml::file(config_path));
    } else {
        file_missing = Some(config_path.to_string());
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    for key in STRING_KEYS {
        if let Ok(value) = std::env::var(env_var_name(key)) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }

    let config: Config = figment.extract().map_err(Box::new)?;

    Ok(ConfigLoadResult { config, file_missing })
}

/// Generates the default configuration as a pretty-printed TOML string.
///
/// # Errors
///
/// Returns an error if the default configuration cannot be serialized to TOML.
pub fn generate_default() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&Config::default())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.api.key = "key".to_string();
        config.api.access_key = "access".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.workflow.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.workflow.preset, "other_rtsp_pull");
        assert_eq!(config.data.dir, "./data");
        assert_eq!(config.effective_log_level(), Level::WARN);
    }

    #[test]
    fn test_validate_reports_missing_credentials() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api.key"))));

        let mut config = valid_config();
        config.api.access_key = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api.access_key"))));

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_base_url_and_version() {
        let mut config = valid_config();
        config.api.base_url = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api.base_url"))));

        let mut config = valid_config();
        config.api.version = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api.version"))));
    }

    #[test]
    fn test_validate_rejects_non_http_url_and_zero_durations() {
        let mut config = valid_config();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let mut config = valid_config();
        config.http.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Zero("http.timeout_secs"))));

        let mut config = valid_config();
        config.workflow.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Zero("workflow.poll_interval_secs"))));
    }

    #[test]
    fn test_debug_raises_log_level() {
        let mut config = valid_config();
        config.log.level = LogLevel::Error;
        config.api.debug = true;
        assert_eq!(config.effective_log_level(), Level::DEBUG);
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "http://127.0.0.1:8080"
version = "v1.3"
key = "k"
access_key = "a"
debug = true

[workflow]
poll_interval_secs = 2
"#
        )
        .unwrap();

        let result = load(file.path().to_str().unwrap()).unwrap();
        assert!(result.file_missing.is_none());
        let config = result.config;
        assert_eq!(config.api.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.api.version, "v1.3");
        assert!(config.api.debug);
        assert_eq!(config.workflow.poll_interval_secs, 2);
        assert_eq!(config.workflow.preset, "other_rtsp_pull");
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let result = load("/nonexistent/cloudlive.toml").unwrap();
        assert_eq!(result.file_missing.as_deref(), Some("/nonexistent/cloudlive.toml"));
        assert_eq!(result.config.api.version, "v1");
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[http]\ntimeout_secs = \"soon\"").unwrap();

        assert!(matches!(load(file.path().to_str().unwrap()), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("api.access_key"), "CLOUDLIVE_API__ACCESS_KEY");
        assert_eq!(env_var_name("data.dir"), "CLOUDLIVE_DATA__DIR");
    }

    #[test]
    fn test_numeric_env_credentials_stay_strings() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cloudlive.toml",
                r#"
[api]
key = "from-file"
access_key = "from-file"
"#,
            )?;
            jail.set_env("CLOUDLIVE_API__KEY", "1234567890");
            jail.set_env("CLOUDLIVE_API__ACCESS_KEY", "0042");

            let config = load("cloudlive.toml").map_err(|e| e.to_string())?.config;
            assert_eq!(config.api.key, "1234567890");
            assert_eq!(config.api.access_key, "0042");
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_generate_default_round_trips() {
        let toml_string = generate_default().unwrap();
        assert!(toml_string.contains("[api]"));
        assert!(toml_string.contains("poll_interval_secs = 10"));
        let parsed: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.api.base_url, Config::default().api.base_url);
    }
}
