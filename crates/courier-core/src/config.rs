//! Configuration consumed by `AppBuilder`.
//!
//! The binary fills these in from CLI flags / environment variables.

use std::time::Duration;

/// Which history backend to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Process-local map. Lost on restart.
    #[default]
    Memory,
    /// SQLite database at the given sqlx URL (`sqlite://path.db`, `sqlite::memory:`).
    Sqlite(SqliteConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long one statement waits on a locked database before failing
    /// with SQLITE_BUSY. Inserts retry on top of this, so keep it short.
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(250),
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// `sqlite::memory:` style URLs need a single shared connection.
    pub fn is_memory(&self) -> bool {
        let url = self.url.trim();
        url.contains(":memory:") || url == "sqlite://" || url.ends_with("mode=memory")
    }
}

/// Outbound call settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// `None` (the default) means the outbound call may block indefinitely.
    pub timeout: Option<Duration>,
}

impl ForwarderConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}
