use serde::{Deserialize, Serialize};

use super::layout::FrameLayout;
use super::{ProtocolError, Result};
use crate::serial::framing::find_delimiter;

/// Pin values above this read as digital high.
pub const DIGITAL_THRESHOLD: u8 = 100;

/// Decoded telemetry: one value per pin, pin 1 first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinReading {
    values: Vec<u8>,
}

impl PinReading {
    pub fn new(values: Vec<u8>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn into_values(self) -> Vec<u8> {
        self.values
    }

    /// Value of pin `index` (0-based).
    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn digital(&self) -> Vec<bool> {
        self.values.iter().map(|&v| v > DIGITAL_THRESHOLD).collect()
    }
}

/// Check a frame against `layout`; returns the pin bytes on success.
///
/// Order of checks: length, stray delimiter (fixed-length layouts only),
/// checksum. Frames split by a link's `FrameCodec` never contain the
/// delimiter, so the stray-delimiter check only fires for frames handed in
/// directly, e.g. from a capture or another framing layer.
pub fn validate_frame<'a>(layout: &FrameLayout, frame: &'a [u8]) -> Result<&'a [u8]> {
    if let Some(expected) = layout.expected_len {
        if frame.len() != expected {
            return Err(ProtocolError::FrameLength {
                expected,
                actual: frame.len(),
            });
        }
    }
    if frame.len() < layout.pin_count {
        return Err(ProtocolError::FrameLength {
            expected: layout.pin_count,
            actual: frame.len(),
        });
    }
    if let (Some(delimiter), Some(_)) = (layout.delimiter, layout.expected_len) {
        if find_delimiter(frame, delimiter).is_some() {
            return Err(ProtocolError::DelimiterMismatch);
        }
    }
    if let Some(checksum) = layout.checksum {
        checksum.verify(frame, layout.checksum_offset)?;
    }
    Ok(&frame[..layout.pin_count])
}

pub fn decode_pins(layout: &FrameLayout, frame: &[u8]) -> Result<PinReading> {
    validate_frame(layout, frame).map(|pins| PinReading::new(pins.to_vec()))
}
