use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_LOG_FILTER: &str = "linguistikad=info";

/// How many times a view repeats a read that failed transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace opened at startup; the console can still pick another one.
    pub workspace: Option<PathBuf>,
    /// How long SQLite waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
    /// `tracing` filter directives for the stderr log.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Filter for the stderr log. Unparseable directives fall back to the
    /// default filter.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|e| {
            eprintln!("invalid log filter {:?}: {e}", self.log_filter);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        })
    }
}
