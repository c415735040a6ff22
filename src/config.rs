//! Configuration system for skein
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. Values set explicitly by the embedding program
//! 2. Environment variables (SKEIN_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! The resulting [`SkeinConfig`] is immutable once built and is passed
//! explicitly to the components that need it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::rpc::CallOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeinConfig {
    /// Outbound call defaults
    pub client: ClientSettings,

    /// Fault containment settings
    pub fault: FaultSettings,

    /// Static service registry
    pub registry: RegistrySettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Outbound call defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Request timeout handed to the transport, in milliseconds
    pub default_timeout_ms: u64,

    /// Transport-level retries
    pub retries: u32,
}

/// Fault containment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSettings {
    /// Maximum bytes of a captured backtrace written to a log entry
    pub max_stack_bytes: usize,
}

/// Static service registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Known service instances
    pub nodes: Vec<NodeEntry>,
}

/// One registered service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub service: String,
    pub id: String,
    pub address: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// ─────────────────────────────────────────────────────────────────
// Default implementations
// ─────────────────────────────────────────────────────────────────

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            retries: 0,
        }
    }
}

impl Default for FaultSettings {
    fn default() -> Self {
        Self { max_stack_bytes: 2048 }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ClientSettings {
    /// Call options every call starts from
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            request_timeout: Duration::from_millis(self.default_timeout_ms),
            retries: self.retries,
            ..CallOptions::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

impl SkeinConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text without overrides or validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("skein.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("skein").join("skein.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".skein").join("skein.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/skein/skein.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by `SKEIN_*` variable name
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Client settings
        if let Some(n) = lookup("SKEIN_CLIENT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.client.default_timeout_ms = n;
        }
        if let Some(n) = lookup("SKEIN_CLIENT_RETRIES").and_then(|v| v.parse().ok()) {
            self.client.retries = n;
        }

        // Fault settings
        if let Some(n) = lookup("SKEIN_MAX_STACK_BYTES").and_then(|v| v.parse().ok()) {
            self.fault.max_stack_bytes = n;
        }

        // Logging settings
        if let Some(val) = lookup("SKEIN_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("SKEIN_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("SKEIN_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.client.default_timeout_ms == 0 {
            return Err(Error::config_field_invalid(
                "client.default_timeout_ms",
                "default_timeout_ms must be greater than 0",
            ));
        }

        if self.fault.max_stack_bytes == 0 {
            return Err(Error::config_field_invalid(
                "fault.max_stack_bytes",
                "max_stack_bytes must be greater than 0",
            ));
        }

        for (i, node) in self.registry.nodes.iter().enumerate() {
            if node.service.is_empty() || node.id.is_empty() || node.address.is_empty() {
                return Err(Error::config_field_invalid(
                    format!("registry.nodes[{}]", i),
                    "registry entries need a service, an id and an address",
                ));
            }
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Write a commented default configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".skein")
                .join("skein.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, generate_default_config())?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# skein configuration

[client]
# Request timeout handed to the transport (milliseconds)
default_timeout_ms = 30000

# Transport-level retries (the call pipeline never retries)
retries = 0

[fault]
# Maximum bytes of a captured backtrace written to a log entry
max_stack_bytes = 2048

[registry]
# Static service instances, selected round-robin per service
# nodes = [
#   { service = "users", id = "users-1", address = "10.0.0.1:9000" },
# ]
nodes = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out for console only)
# file = "~/.skein/logs/skein.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
