//! Binary protocol of the supported boards: checksums, frame layouts,
//! inbound validation and outbound packet encoding.
pub mod checksum;
pub mod layout;
pub mod packet;
pub mod premium;
pub mod validate;
pub mod xboard;

pub use checksum::{additive_checksum, xor_checksum, Checksum};
pub use layout::FrameLayout;
pub use packet::Packet;
pub use validate::{decode_pins, validate_frame, PinReading, DIGITAL_THRESHOLD};

/// Classification of a corrupted inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Checksum mismatch: computed 0x{expected:02X}, trailer 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Delimiter mismatch: frame still contains the delimiter")]
    DelimiterMismatch,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
