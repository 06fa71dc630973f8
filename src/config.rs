use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use analyst1_core::LookupOptions;

use crate::cli::args::LookupArgs;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Analyst1Config {
    #[serde(default)]
    pub request: RequestSettings,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport settings applied once at startup. Empty strings mean "unset".
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RequestSettings {
    /// Path to the client certificate (PEM, or PKCS#12 when a passphrase is set)
    #[serde(default)]
    pub cert: String,

    /// Path to the client private key (PKCS#8 PEM)
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub passphrase: String,

    /// Path to an additional certificate authority (PEM)
    #[serde(default)]
    pub ca: String,

    /// HTTP proxy URL, credentials may be embedded
    #[serde(default)]
    pub proxy: String,

    /// Reject servers with invalid certificates
    #[serde(default = "default_reject_unauthorized")]
    pub reject_unauthorized: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_reject_unauthorized() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            cert: String::new(),
            key: String::new(),
            passphrase: String::new(),
            ca: String::new(),
            proxy: String::new(),
            reject_unauthorized: default_reject_unauthorized(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tenant options used to build per-call lookup options.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OptionsConfig {
    /// Analyst1 API base URL including scheme and port
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub password: String,

    /// Only return results for an exactly matched indicator value
    #[serde(default = "default_match_search")]
    pub do_indicator_match_search: bool,
}

fn default_match_search() -> bool {
    true
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_name: String::new(),
            password: String::new(),
            do_indicator_match_search: default_match_search(),
        }
    }
}

impl OptionsConfig {
    pub fn to_lookup_options(&self) -> LookupOptions {
        LookupOptions::new(&self.url, &self.user_name, &self.password)
            .with_match_search(self.do_indicator_match_search)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL in {field}: {value}")]
    InvalidUrl { field: String, value: String },

    #[error("Invalid value in {field}: {value} (expected {expected})")]
    InvalidValue { field: String, value: String, expected: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A config file as written: only the keys it sets are `Some`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub request: RequestFile,
    #[serde(default)]
    pub options: OptionsFile,
    #[serde(default)]
    pub logging: LoggingFile,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RequestFile {
    pub cert: Option<String>,
    pub key: Option<String>,
    pub passphrase: Option<String>,
    pub ca: Option<String>,
    pub proxy: Option<String>,
    pub reject_unauthorized: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct OptionsFile {
    pub url: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub do_indicator_match_search: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoggingFile {
    pub level: Option<String>,
}

impl ConfigFile {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

fn overlay<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl Analyst1Config {
    /// Merge a config file into this one. Every key the file sets wins,
    /// including keys set back to their default value.
    pub fn merge(&mut self, file: &ConfigFile) {
        overlay(&mut self.request.cert, &file.request.cert);
        overlay(&mut self.request.key, &file.request.key);
        overlay(&mut self.request.passphrase, &file.request.passphrase);
        overlay(&mut self.request.ca, &file.request.ca);
        overlay(&mut self.request.proxy, &file.request.proxy);
        overlay(&mut self.request.reject_unauthorized, &file.request.reject_unauthorized);
        overlay(&mut self.request.timeout_secs, &file.request.timeout_secs);

        overlay(&mut self.options.url, &file.options.url);
        overlay(&mut self.options.user_name, &file.options.user_name);
        overlay(&mut self.options.password, &file.options.password);
        overlay(
            &mut self.options.do_indicator_match_search,
            &file.options.do_indicator_match_search,
        );

        overlay(&mut self.logging.level, &file.logging.level);
    }

    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_else(|_| {
            r#"# Analyst1 lookup configuration

[request]
cert = ""
key = ""
passphrase = ""
ca = ""
proxy = ""
reject_unauthorized = true
timeout_secs = 30

[options]
url = ""
user_name = ""
password = ""
do_indicator_match_search = true

[logging]
level = "info"
"#
            .to_string()
        })
    }

    /// Get the user config file path (~/.config/analyst1-lookup/config.toml)
    pub fn get_user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/analyst1-lookup/config.toml"))
    }

    /// Get the system config file path (/etc/analyst1-lookup/config.toml)
    pub fn get_system_config_path() -> PathBuf {
        PathBuf::from("/etc/analyst1-lookup/config.toml")
    }

    /// Get the current directory config file path (./analyst1.toml)
    pub fn get_current_config_path() -> PathBuf {
        PathBuf::from("./analyst1.toml")
    }

    /// Load and merge configs from all sources with priority:
    /// 1. User config - lowest priority (base)
    /// 2. Current directory (./analyst1.toml)
    /// 3. System config - highest priority
    pub fn load_with_merged_configs() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let mut candidates = Vec::new();
        if let Some(user_path) = Self::get_user_config_path() {
            candidates.push(user_path);
        }
        candidates.push(Self::get_current_config_path());
        candidates.push(Self::get_system_config_path());

        for path in candidates.into_iter().filter(|p| p.exists()) {
            match ConfigFile::load_from_file(&path) {
                Ok(file_config) => {
                    config.merge(&file_config);
                    tracing::debug!("Loaded config from: {}", path.display());
                }
                Err(e) => tracing::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }

        Ok(config)
    }

    pub fn apply_env_vars(&mut self, env_vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in env_vars {
            if let Some(config_key) = key.strip_prefix("ANALYST1_") {
                match config_key {
                    "URL" => self.options.url = value.clone(),
                    "USER_NAME" => self.options.user_name = value.clone(),
                    "PASSWORD" => self.options.password = value.clone(),
                    "MATCH_SEARCH" => {
                        self.options.do_indicator_match_search = value.parse()
                            .map_err(|_| anyhow!("Invalid match_search value: {}", value))?;
                    }
                    "REQUEST_CERT" => self.request.cert = value.clone(),
                    "REQUEST_KEY" => self.request.key = value.clone(),
                    "REQUEST_PASSPHRASE" => self.request.passphrase = value.clone(),
                    "REQUEST_CA" => self.request.ca = value.clone(),
                    "REQUEST_PROXY" => self.request.proxy = value.clone(),
                    "REQUEST_REJECT_UNAUTHORIZED" => {
                        self.request.reject_unauthorized = value.parse()
                            .map_err(|_| anyhow!("Invalid reject_unauthorized value: {}", value))?;
                    }
                    "REQUEST_TIMEOUT_SECS" => {
                        self.request.timeout_secs = value.parse()
                            .map_err(|_| anyhow!("Invalid timeout_secs value: {}", value))?;
                    }
                    "LOG_LEVEL" => self.logging.level = value.to_lowercase(),
                    _ => {} // Ignore unknown environment variables
                }
            }
        }
        Ok(())
    }

    pub fn apply_lookup_args(&mut self, args: &LookupArgs) {
        if let Some(ref url) = args.url {
            self.options.url = url.clone();
        }
        if let Some(ref user_name) = args.user_name {
            self.options.user_name = user_name.clone();
        }
        if let Some(ref password) = args.password {
            self.options.password = password.clone();
        }
        if args.exact {
            self.options.do_indicator_match_search = true;
        }
        if args.search {
            self.options.do_indicator_match_search = false;
        }
        if let Some(ref proxy) = args.proxy {
            self.request.proxy = proxy.clone();
        }
        if args.insecure {
            self.request.reject_unauthorized = false;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.request.timeout_secs = timeout_secs;
        }
    }

    /// Load configuration with full precedence chain:
    /// 1. Default values (lowest)
    /// 2. User, current directory and system config files
    /// 3. Explicit config file
    /// 4. Environment variables (ANALYST1_*)
    /// 5. CLI arguments (highest)
    pub fn load_with_precedence(
        config_path: Option<&Path>,
        cli_args: Option<&LookupArgs>,
        env_vars: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut config = Self::load_with_merged_configs()
            .unwrap_or_else(|_| Self::default());

        if let Some(path) = config_path {
            let explicit_config = ConfigFile::load_from_file(path)
                .map_err(|e| anyhow!("Failed to load config file {}: {}", path.display(), e))?;
            config.merge(&explicit_config);
        }

        config.apply_env_vars(env_vars)?;
        if let Some(args) = cli_args {
            config.apply_lookup_args(args);
        }
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.options.url.is_empty() {
            let valid = reqwest::Url::parse(&self.options.url)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidUrl {
                    field: "options.url".to_string(),
                    value: self.options.url.clone(),
                });
            }
        }

        if !self.request.proxy.is_empty() && reqwest::Url::parse(&self.request.proxy).is_err() {
            return Err(ConfigError::InvalidUrl {
                field: "request.proxy".to_string(),
                value: self.request.proxy.clone(),
            });
        }

        if self.request.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request.timeout_secs".to_string(),
                value: "0".to_string(),
                expected: "a positive number of seconds".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                expected: LOG_LEVELS.join(", "),
            });
        }

        Ok(())
    }

    /// Config rendered as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if !redacted.options.password.is_empty() {
            redacted.options.password = "********".to_string();
        }
        if !redacted.request.passphrase.is_empty() {
            redacted.request.passphrase = "********".to_string();
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}
