pub mod microbit;
pub mod models;
pub mod registry;
pub mod retry;
pub mod wise_xboard;
pub mod wise_xboard_premium;

pub use microbit::MicrobitControl;
pub use models::*;
pub use registry::{create_control, find_first_port, lookup, match_port, open_device, registry};
pub use retry::RetryingReader;
pub use wise_xboard::WiseXboardControl;
pub use wise_xboard_premium::WiseXboardPremiumControl;

use std::sync::Arc;

use async_trait::async_trait;

use crate::protocol::{PinReading, ProtocolError};
use crate::serial::{SerialError, SerialLink};

/// Capabilities shared by every supported board.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    fn descriptor(&self) -> &'static DeviceDescriptor;

    fn link(&self) -> &Arc<SerialLink>;

    fn is_readable(&self) -> bool {
        self.link().is_readable()
    }

    /// Current analog value of every pin.
    async fn analog_read(&self) -> Result<PinReading>;

    /// Pin values thresholded to digital readings.
    async fn digital_read(&self) -> Result<Vec<bool>> {
        Ok(self.analog_read().await?.digital())
    }
}

/// Fail with [`DeviceError::NotConnected`] unless the link can be read.
pub(crate) fn ensure_readable(link: &SerialLink) -> Result<()> {
    if !link.is_readable() {
        return Err(DeviceError::NotConnected);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Invalid frame: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("No valid frame after {attempts} attempts, last error: {last}")]
    RetryExhausted { attempts: u32, last: ProtocolError },

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] SerialError),
}

impl DeviceError {
    /// Corrupted-frame errors that a fresh read may cure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeviceError::Protocol(_))
    }

    pub fn is_connection_closed(&self) -> bool {
        matches!(self, DeviceError::SerialError(SerialError::ConnectionClosed))
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
