//! Runtime configuration and static dashboard content.
//!
//! Everything is read once in `main` and passed explicitly to the pieces
//! that need it; nothing here is global state.
//!
//! | Variable                  | Default                 |
//! |---------------------------|-------------------------|
//! | `STATUS_API_URL`          | `http://localhost:8080` |
//! | `STATUS_POLL_INTERVAL_MS` | `30000`                 |
//! | `STATUS_LOG_FILE`         | unset (no logging)      |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::refresh::DEFAULT_POLL_INTERVAL;
use crate::source::{Incident, IncidentKind};

pub const APP_NAME: &str = "Service Status Monitor";
pub const APP_DESCRIPTION: &str = "Real-time status updates for all our web services";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the status backend.
    pub base_url: String,
    /// Time between scheduled refreshes.
    pub poll_interval: Duration,
    /// Where to write the tracing log.  The TUI owns the terminal, so there
    /// is no console fallback.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value lookup.  Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(url) = get("STATUS_API_URL") {
            config.base_url = url.trim().to_string();
        }

        if let Some(raw) = get("STATUS_POLL_INTERVAL_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("STATUS_POLL_INTERVAL_MS is not a number: {raw:?}"))?;
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(path) = get("STATUS_LOG_FILE") {
            config.log_file = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the base URL (e.g. from the command line).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.base_url = url.into();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("base URL must start with http:// or https://, got {:?}", self.base_url);
        }
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than 0");
        }
        Ok(())
    }
}

/// Incidents shown below the service list.
///
/// The backend has no incident endpoint yet, so these are maintained here.
pub fn incidents() -> Vec<Incident> {
    vec![
        Incident {
            service_name: "MongoDB Atlas".to_string(),
            kind: IncidentKind::Warning,
            message: "Scheduled maintenance from 02:00 AM to 04:00 AM UTC.".to_string(),
        },
        Incident {
            service_name: "System".to_string(),
            kind: IncidentKind::Info,
            message: "All services operational.".to_string(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
