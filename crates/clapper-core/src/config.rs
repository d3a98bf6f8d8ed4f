//! Configuration loading and typed config structures for the Clapper service.
//!
//! Configuration is read from an optional YAML file (every field has a
//! default, so an empty file is valid) and then overridden by environment
//! variables:
//!
//! | Variable                  | Overrides                  |
//! |---------------------------|----------------------------|
//! | `CLAPPER_ADDR`            | `server.addr`              |
//! | `CLAPPER_STORE_PATH`      | `persistence.path`         |
//! | `CLAPPER_ALLOWED_ORIGINS` | `server.allowed_origins`   |
//! | `CLAPPER_MAX_SESSIONS`    | `server.max_sessions`      |
//!
//! An unset `persistence.path` selects the in-memory store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "CLAPPER_CONFIG";

/// Config file picked up from the working directory when
/// [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "clapper.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent with another.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClapperConfig {
    /// HTTP listener and admission settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Counter tick settings.
    #[serde(default)]
    pub counter: CounterConfig,

    /// Durable store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Per-connection keepalive and push timing.
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClapperConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from the file named by `CLAPPER_CONFIG`, else `clapper.yaml` if
    /// present, else defaults. Environment overrides apply in every case.
    ///
    /// # Errors
    ///
    /// See [`from_file`](Self::from_file).
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CLAPPER_ADDR") {
            self.server.addr = addr;
        }
        if let Some(path) = lookup("CLAPPER_STORE_PATH") {
            self.persistence.path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(origins) = lookup("CLAPPER_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(max) = lookup("CLAPPER_MAX_SESSIONS") {
            self.server.max_sessions = max
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("invalid CLAPPER_MAX_SESSIONS: {e}")))?;
        }
        Ok(())
    }

    /// Check ranges and cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "server.max_sessions must be at least 1".to_owned(),
            ));
        }

        let nonzero = [
            ("counter.tick_interval_ms", self.counter.tick_interval_ms),
            ("counter.tick_quantum_ms", self.counter.tick_quantum_ms),
            ("persistence.interval_ms", self.persistence.interval_ms),
            ("session.write_period_ms", self.session.write_period_ms),
            ("session.ping_period_ms", self.session.ping_period_ms),
            ("session.pong_wait_ms", self.session.pong_wait_ms),
            ("session.write_wait_ms", self.session.write_wait_ms),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
        }

        if self.session.ping_period_ms >= self.session.pong_wait_ms {
            return Err(ConfigError::Invalid(format!(
                "session.ping_period_ms ({}) must be less than session.pong_wait_ms ({})",
                self.session.ping_period_ms, self.session.pong_wait_ms
            )));
        }

        if self.session.max_message_bytes == 0 {
            return Err(ConfigError::Invalid(
                "session.max_message_bytes must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

/// HTTP listener and admission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Hosts whose `Origin` is trusted for upgrades and CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum concurrent broadcast sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            allowed_origins: default_allowed_origins(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Counter tick configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CounterConfig {
    /// Period of the increment loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Milliseconds added per increment.
    #[serde(default = "default_tick_quantum_ms")]
    pub tick_quantum_ms: u64,
}

impl CounterConfig {
    /// Increment loop period.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            tick_quantum_ms: default_tick_quantum_ms(),
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Record file. Unset means in-memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Period of the persistence loop.
    #[serde(default = "default_persist_interval_ms")]
    pub interval_ms: u64,
}

impl PersistenceConfig {
    /// Persistence loop period.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            interval_ms: default_persist_interval_ms(),
        }
    }
}

/// Per-connection timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// How often the counter display is pushed.
    #[serde(default = "default_write_period_ms")]
    pub write_period_ms: u64,

    /// How often a heartbeat ping is sent. Must be below `pong_wait_ms`.
    #[serde(default = "default_ping_period_ms")]
    pub ping_period_ms: u64,

    /// Read-liveness deadline, extended by every inbound frame.
    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,

    /// Deadline for a single outbound frame.
    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    /// Largest inbound message accepted.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl SessionConfig {
    /// Display push period.
    pub const fn write_period(&self) -> Duration {
        Duration::from_millis(self.write_period_ms)
    }

    /// Heartbeat period.
    pub const fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }

    /// Read-liveness deadline.
    pub const fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Per-write deadline.
    pub const fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_period_ms: default_write_period_ms(),
            ping_period_ms: default_ping_period_ms(),
            pong_wait_ms: default_pong_wait_ms(),
            write_wait_ms: default_write_wait_ms(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_addr() -> String {
    String::from("0.0.0.0:8710")
}

fn default_allowed_origins() -> Vec<String> {
    vec![String::from("jarv.org"), String::from("localhost")]
}

const fn default_max_sessions() -> usize {
    512
}

const fn default_tick_interval_ms() -> u64 {
    1
}

const fn default_tick_quantum_ms() -> u64 {
    crate::counter::DEFAULT_TICK_QUANTUM_MS
}

const fn default_persist_interval_ms() -> u64 {
    10_000
}

const fn default_write_period_ms() -> u64 {
    100
}

const fn default_ping_period_ms() -> u64 {
    54_000
}

const fn default_pong_wait_ms() -> u64 {
    60_000
}

const fn default_write_wait_ms() -> u64 {
    10_000
}

const fn default_max_message_bytes() -> usize {
    512
}
