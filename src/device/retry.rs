use std::future::Future;

use super::{DeviceError, Result};
use crate::logging::LinkLog;

/// Bounded retry around a single decode attempt.
///
/// Corrupted frames ([`DeviceError::Protocol`]) trigger another attempt until
/// the budget is spent, then [`DeviceError::RetryExhausted`]. Every other
/// error is returned as is.
#[derive(Debug, Clone)]
pub struct RetryingReader {
    max_attempts: u32,
    log: LinkLog,
}

impl RetryingReader {
    pub fn new(max_attempts: u32, log: LinkLog) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            log,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn read<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut made = 0;
        loop {
            made += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(DeviceError::Protocol(last)) if made >= self.max_attempts => {
                    self.log.warn(format_args!("giving up after {} attempts: {}", made, last));
                    return Err(DeviceError::RetryExhausted {
                        attempts: made,
                        last,
                    });
                }
                Err(DeviceError::Protocol(e)) => {
                    self.log.debug(format_args!("attempt {} failed ({}), retrying", made, e));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
