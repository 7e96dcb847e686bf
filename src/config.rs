use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LinkLog;
use crate::serial::{Result, SerialError};

/// Tuning knobs for one serial link and the device control on top of it.
///
/// # Example JSON
/// ```json
/// {
///     "event_capacity": 512,
///     "read_timeout_ms": 1000,
///     "retry_attempts": 3,
///     "verbose": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// Frames buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
    /// Upper bound of the delimiter accumulator.
    pub max_frame_len: usize,
    /// Deadline for a single frame read. `None` waits until the link closes.
    pub read_timeout_ms: Option<u64>,
    /// Attempts per logical read on noisy devices.
    pub retry_attempts: u32,
    /// Hex dumps of every frame and packet.
    pub verbose: bool,
    /// Overrides the device family baud rate.
    pub baud_rate: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            max_frame_len: 8192,
            read_timeout_ms: None,
            retry_attempts: 2,
            verbose: false,
            baud_rate: None,
        }
    }
}

impl LinkConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SerialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SerialError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(SerialError::Config("event_capacity must be greater than 0".to_string()));
        }
        if self.max_frame_len == 0 {
            return Err(SerialError::Config("max_frame_len must be greater than 0".to_string()));
        }
        if self.retry_attempts == 0 {
            return Err(SerialError::Config("retry_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Log sink honoring the `verbose` flag.
    pub fn log(&self, target: &str) -> LinkLog {
        LinkLog::new(target).verbose(self.verbose)
    }
}
