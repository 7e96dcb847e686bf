//! Serial communication engine for robotics and education boards.
//!
//! A [`SerialLink`] owns one serial connection, splits the inbound byte
//! stream into frames and fans them out to any number of subscribers. The
//! [`device`] module layers per-board controls (micro:bit, wiseXboard,
//! wiseXboardPremium) on top of it: telemetry decoding, checksum validation
//! with bounded retry, and command packet encoding.

pub mod config;
pub mod device;
pub mod logging;
pub mod protocol;
pub mod serial;

pub use config::LinkConfig;
pub use device::{
    open_device, DeviceControl, DeviceDescriptor, DeviceError, DeviceKind, MicrobitControl, RetryingReader,
    WiseXboardControl, WiseXboardPremiumControl,
};
pub use logging::LinkLog;
pub use protocol::{PinReading, ProtocolError};
pub use serial::{ConnectionState, Frame, SerialError, SerialLink};
