use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{QueueError, Result};
use crate::queue::lease::{DirLease, DEFAULT_RETRY_INTERVAL};
use crate::queue::{
    FileQueueService, MemoryQueueService, QueueService, SystemClock, DEFAULT_VISIBILITY_TIMEOUT,
};
use crate::resp::RespConfig;

/// Which storage backend serves the queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    File { root: PathBuf },
}

/// Process configuration, read from `TIDEQ_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub resp: RespConfig,
    pub backend: Backend,
    pub visibility_timeout: Duration,
    pub lock_retry_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resp: RespConfig::default(),
            backend: Backend::Memory,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            lock_retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset keys take their defaults;
    /// set but unparseable values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let host = lookup("TIDEQ_HOST").unwrap_or(defaults.resp.host);
        let port = parse_var(&lookup, "TIDEQ_PORT")?.unwrap_or(defaults.resp.port);

        let backend = match lookup("TIDEQ_BACKEND").as_deref() {
            None | Some("memory") => Backend::Memory,
            Some("file") => {
                let root = lookup("TIDEQ_ROOT").ok_or_else(|| {
                    QueueError::Config("TIDEQ_ROOT is required for the file backend".to_string())
                })?;
                Backend::File { root: root.into() }
            }
            Some(other) => {
                return Err(QueueError::Config(format!(
                    "unknown backend {other:?}, expected \"memory\" or \"file\""
                )))
            }
        };

        let visibility_timeout = parse_var::<u64>(&lookup, "TIDEQ_VISIBILITY_TIMEOUT")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.visibility_timeout);
        let lock_retry_interval = parse_var::<u64>(&lookup, "TIDEQ_LOCK_RETRY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.lock_retry_interval);

        Ok(Self {
            resp: RespConfig { host, port },
            backend,
            visibility_timeout,
            lock_retry_interval,
        })
    }

    /// Creates the configured backend.
    pub fn build_service(&self) -> Result<Arc<dyn QueueService>> {
        let service: Arc<dyn QueueService> = match &self.backend {
            Backend::Memory => Arc::new(MemoryQueueService::with_visibility_timeout(
                self.visibility_timeout,
            )),
            Backend::File { root } => Arc::new(FileQueueService::with_parts(
                root.clone(),
                self.visibility_timeout,
                Arc::new(DirLease::new(self.lock_retry_interval)),
                Arc::new(SystemClock::new()),
            )?),
        };
        Ok(service)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| QueueError::Config(format!("{key}={raw:?} is not a valid value"))),
    }
}
