//! # Configuration Management
//!
//! Centralized configuration for the channel transport.
//!
//! This module provides structured configuration for listeners and endpoints,
//! including framing parameters, timeouts, and logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides
//!
//! ## Defaults
//! - Connect timeout 1500 ms, read timeout 5000 ms
//! - Listen backlog 100
//! - Stop-byte framing enabled with ASCII EOT (0x04)
//! - Auto-flush enabled

use crate::error::{Error, Result};
use crate::protocol::handler::TransportMode;
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default message terminator: ASCII "end of transmission"
pub const DEFAULT_STOP_BYTE: u8 = 0x04;

/// Default listen backlog for bound listeners
pub const DEFAULT_BACKLOG: u32 = 100;

/// Chunk size for the growable read buffer (bytes)
pub const READ_CHUNK_SIZE: usize = 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetConfig {
    /// Listener-specific configuration
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Endpoint-specific configuration
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(port) = std::env::var("NETCHANNEL_LISTENER_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                config.listener.port = val;
            }
        }

        if let Ok(backlog) = std::env::var("NETCHANNEL_LISTENER_BACKLOG") {
            if let Ok(val) = backlog.parse::<u32>() {
                config.listener.backlog = val;
            }
        }

        if let Ok(mode) = std::env::var("NETCHANNEL_TRANSPORT_MODE") {
            config.listener.mode = mode.parse::<TransportMode>()?;
        }

        if let Ok(addr) = std::env::var("NETCHANNEL_ENDPOINT_ADDRESS") {
            config.endpoint.address = addr;
        }

        if let Ok(timeout) = std::env::var("NETCHANNEL_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.endpoint.connect_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(timeout) = std::env::var("NETCHANNEL_READ_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.listener.read_timeout = Duration::from_millis(val);
                config.endpoint.read_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.listener.validate());
        errors.extend(self.endpoint.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Message framing parameters shared by listeners and endpoints.
///
/// Fixed at construction time; every channel a listener produces inherits
/// the listener's framing unchanged.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FramingConfig {
    /// Whether messages are terminated by a stop byte
    pub use_stop_byte: bool,

    /// The stop byte value (ignored when `use_stop_byte` is false)
    pub stop_byte: u8,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            use_stop_byte: true,
            stop_byte: DEFAULT_STOP_BYTE,
        }
    }
}

impl FramingConfig {
    /// Framing with no stop byte; message boundaries fall back to the
    /// stream-availability heuristic. Only suitable for trusted or local
    /// peers where a producer never pauses mid-message.
    pub fn unframed() -> Self {
        Self {
            use_stop_byte: false,
            stop_byte: DEFAULT_STOP_BYTE,
        }
    }
}

/// Listener-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Port to bind (0 requests an OS-assigned ephemeral port)
    pub port: u16,

    /// Listen backlog for the bound socket
    pub backlog: u32,

    /// Transport mode dispatched to registered handlers
    #[serde(default)]
    pub mode: TransportMode,

    /// Timeout applied to each read on an accepted connection
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Message framing inherited by every accepted connection's channels
    #[serde(default)]
    pub framing: FramingConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            backlog: DEFAULT_BACKLOG,
            mode: TransportMode::default(),
            read_timeout: timeout::DEFAULT_READ_TIMEOUT,
            framing: FramingConfig::default(),
        }
    }
}

impl ListenerConfig {
    /// Validate listener configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.backlog == 0 {
            errors.push("Listener backlog must be greater than 0".to_string());
        } else if self.backlog > 65_535 {
            errors.push(format!(
                "Listener backlog too large: {} (maximum: 65,535)",
                self.backlog
            ));
        }

        if self.read_timeout.as_millis() < 10 {
            errors.push("Read timeout too short (minimum: 10ms)".to_string());
        } else if self.read_timeout.as_secs() > 300 {
            errors.push("Read timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Endpoint-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Remote host name or address
    pub address: String,

    /// Remote port
    pub port: u16,

    /// Timeout for the connection attempt
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout applied to each read on the open connection
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Message framing for the outbound channel
    #[serde(default)]
    pub framing: FramingConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1"),
            port: 0,
            connect_timeout: timeout::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: timeout::DEFAULT_READ_TIMEOUT,
            framing: FramingConfig::default(),
        }
    }
}

impl EndpointConfig {
    /// Endpoint configuration targeting `address:port` with default timeouts
    pub fn to_addr(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Self::default()
        }
    }

    /// Validate endpoint configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Endpoint address cannot be empty".to_string());
        }

        if self.connect_timeout.as_millis() < 10 {
            errors.push("Connect timeout too short (minimum: 10ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        if self.read_timeout.as_millis() < 10 {
            errors.push("Read timeout too short (minimum: 10ms)".to_string());
        } else if self.read_timeout.as_secs() > 300 {
            errors.push("Read timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("netchannel"),
            log_level: Level::INFO,
            log_to_console: true,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str).map_err(serde::de::Error::custom)
    }
}
