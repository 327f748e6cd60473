//! Arena configuration.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Largest supported board side length.
pub const MAX_BOARD_SIZE: usize = 16;

/// Environment variable naming the SQLite database file.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Environment variable overriding the HTTP port.
pub const PORT_VAR: &str = "ARENA_PORT";

/// Runtime settings for the engine, store and HTTP server.
///
/// Missing TOML keys fall back to [`ArenaConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ArenaConfig {
    /// Board side length for new games.
    board_size: usize,

    /// How long a request waits for a game's lease.
    lock_timeout_ms: u64,

    /// Save attempts per operation before reporting contention.
    max_write_attempts: u32,

    /// SQLite database file; in-memory store when unset.
    #[setters(strip_option, into)]
    database_url: Option<String>,

    /// HTTP bind host.
    #[setters(into)]
    host: String,

    /// HTTP bind port.
    port: u16,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            board_size: crate::games::tictactoe::DEFAULT_BOARD_SIZE,
            lock_timeout_ms: 2000,
            max_write_attempts: 5,
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ArenaConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(board_size = config.board_size, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if given (defaults otherwise), applies environment
    /// overrides and validates the result.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `DATABASE_URL` and `ARENA_PORT` as returned by `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()) {
            debug!(database_url = %url, "Database URL taken from environment");
            self.database_url = Some(url);
        }
        if let Some(raw) = lookup(PORT_VAR) {
            self.port = raw.trim().parse().map_err(|e| {
                warn!(value = %raw, "Unparseable port override");
                ConfigError::new(format!("{} must be a port number: {}", PORT_VAR, e))
            })?;
        }
        Ok(self)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ConfigError::new(format!(
                "board_size must be between 1 and {}, got {}",
                MAX_BOARD_SIZE, self.board_size
            )));
        }
        if self.max_write_attempts == 0 {
            return Err(ConfigError::new(
                "max_write_attempts must be at least 1".to_string(),
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::new(
                "lock_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Lease wait as a duration.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
