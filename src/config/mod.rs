//! Configuration Module
//!
//! Provides TOML-based configuration for the harness with support for:
//! - Broker connection settings and credentials
//! - The device topic root
//! - Wait, poll and settle timings
//! - Capture store limits
//! - Environment variable overrides (LAMPCHECK__* prefix)

use std::path::Path;
use std::time::Duration;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;


/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(re
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    /// Logging configuration
    pub log: LogConfig,
    /// Broker connection
    pub broker: BrokerConfig,
    /// Device under test
    pub device: DeviceConfig,
    /// Wait and settle timings
    pub timing: TimingConfig,
    /// Capture store limits
    pub capture: CaptureConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Broker connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or IP address
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional, requires username)
    pub password: Option<String>,
    /// Client identifier. Empty lets the broker assign one.
    #[serde(default)]
    pub client_id: String,
    /// Keep alive in seconds (0 disables PINGREQ)
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u16,
    /// How long connect() waits for the CONNACK (e.g., "5s")
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Capacity of the outbound command queue
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u16 {
    60
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_command_capacity() -> usize {
    256
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            client_id: String::new(),
            keep_alive: default_keep_alive(),
            connect_timeout: default_connect_timeout(),
            command_capacity: default_command_capacity(),
        }
    }
}

impl BrokerConfig {
    /// `host:port` string for the TCP connect
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Device under test
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Topic root the device publishes and listens under
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String {
    "ikea-lamp".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
        }
    }
}

/// Wait, poll and settle timings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between store polls while waiting (e.g., "100ms")
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Delay between a config request and the wait for its response
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Default timeout for state assertions
    #[serde(default = "default_wait_timeout", with = "humantime_serde")]
    pub wait_timeout: Duration,
    /// Default timeout for config state requests
    #[serde(default = "default_config_timeout", with = "humantime_serde")]
    pub config_timeout: Duration,
    /// Pause scenario suites take after issuing a command
    #[serde(default = "default_command_delay", with = "humantime_serde")]
    pub command_delay: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}
fn default_settle_delay() -> Duration {
    Duration::from_millis(500)
}
fn default_wait_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_config_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_command_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
            wait_timeout: default_wait_timeout(),
            config_timeout: default_config_timeout(),
            command_delay: default_command_delay(),
        }
    }
}

/// Capture store limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum history entries kept (0 = unbounded)
    #[serde(default)]
    pub max_history: usize,
    /// Number of recent messages logged when a config request goes unanswered
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_recent_window() -> usize {
    5
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_history: 0,
            recent_window: default_recent_window(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax in the TOML file
    /// 2. Override via env vars: `LAMPCHECK__` prefix with double underscores for nesting:
    ///    - `LAMPCHECK__BROKER__HOST=10.0.0.5` overrides `broker.host`
    ///    - `LAMPCHECK__DEVICE__TOPIC=lamp-2` overrides `device.topic`
    ///    - `LAMPCHECK__TIMING__SETTLE_DELAY=1s` overrides `timing.settle_delay`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("broker.host", "localhost")?
            .set_default("broker.port", 1883)?
            .set_default("broker.client_id", "")?
            .set_default("broker.keep_alive", 60)?
            .set_default("broker.connect_timeout", "5s")?
            .set_default("broker.command_capacity", 256)?
            .set_default("device.topic", "ikea-lamp")?
            .set_default("timing.poll_interval", "100ms")?
            .set_default("timing.settle_delay", "500ms")?
            .set_default("timing.wait_timeout", "2s")?
            .set_default("timing.config_timeout", "3s")?
            .set_default("timing.command_delay", "1s")?
            .set_default("capture.max_history", 0)?
            .set_default("capture.recent_window", 5)?;

        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let substituted = substitute_env_vars(&content)?;
                builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, use defaults
            }
            Err(e) => return Err(ConfigError::Io(e)),
        }

        // Double underscore separates nested keys, single underscore preserved in field names
        let cfg = builder
            .add_source(
                Environment::with_prefix("LAMPCHECK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: HarnessConfig = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only (no file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "broker.host must not be empty".to_string(),
            ));
        }

        if self.broker.port == 0 {
            return Err(ConfigError::Validation(
                "broker.port must be non-zero".to_string(),
            ));
        }

        if self.broker.password.is_some() && self.broker.username.is_none() {
            return Err(ConfigError::Validation(
                "broker.password requires broker.username".to_string(),
            ));
        }

        if self.broker.command_capacity == 0 {
            return Err(ConfigError::Validation(
                "broker.command_capacity must be non-zero".to_string(),
            ));
        }

        let topic = &self.device.topic;
        if topic.is_empty() {
            return Err(ConfigError::Validation(
                "device.topic must not be empty".to_string(),
            ));
        }
        if topic.contains(|c| c == '+' || c == '#') {
            return Err(ConfigError::Validation(format!(
                "device.topic '{}' must not contain wildcards",
                topic
            )));
        }
        if topic.starts_with('/') || topic.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "device.topic '{}' must not start or end with '/'",
                topic
            )));
        }

        if self.timing.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "timing.poll_interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
