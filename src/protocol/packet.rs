use std::fmt;

/// A fully formed outbound packet. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Last byte of the packet.
    pub fn trailer(&self) -> Option<u8> {
        self.bytes.last().copied()
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", hex::encode(&self.bytes))
    }
}

/// Clamp into `[min, max]`.
pub fn clamp(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

/// Encode a value in `-128..=255` as one byte, negatives as `256 + value`.
pub fn signed_byte(value: i32) -> u8 {
    if value < 0 {
        (256 + value.max(-128)) as u8
    } else {
        value.min(255) as u8
    }
}

/// Clamp to `[-limit, limit]` and encode as a signed byte.
pub fn signed_clamped(value: i32, limit: i32) -> u8 {
    signed_byte(clamp(value, -limit, limit))
}
