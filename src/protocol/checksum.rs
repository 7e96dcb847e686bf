use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{ProtocolError, Result};

/// XOR of every byte.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Sum of every byte, modulo 256.
pub fn additive_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum algorithm over a declared byte range (`end` exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Checksum {
    XorOverRange { start: usize, end: usize },
    AdditiveOverRange { start: usize, end: usize },
}

impl Checksum {
    /// The declared range clipped to a buffer of `len` bytes.
    pub fn range(&self, len: usize) -> Range<usize> {
        let (start, end) = match *self {
            Checksum::XorOverRange { start, end } | Checksum::AdditiveOverRange { start, end } => (start, end),
        };
        let end = end.min(len);
        start.min(end)..end
    }

    pub fn compute(&self, bytes: &[u8]) -> u8 {
        let covered = &bytes[self.range(bytes.len())];
        match self {
            Checksum::XorOverRange { .. } => xor_checksum(covered),
            Checksum::AdditiveOverRange { .. } => additive_checksum(covered),
        }
    }

    /// Write the checksum into the trailer byte at `offset`.
    pub fn seal(&self, packet: &mut [u8], offset: usize) {
        let value = self.compute(packet);
        if let Some(trailer) = packet.get_mut(offset) {
            *trailer = value;
        }
    }

    /// Compare the computed checksum with the trailer byte at `offset`.
    pub fn verify(&self, bytes: &[u8], offset: usize) -> Result<()> {
        let actual = *bytes.get(offset).ok_or(ProtocolError::FrameLength {
            expected: offset + 1,
            actual: bytes.len(),
        })?;
        let expected = self.compute(bytes);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_and_sum() {
        assert_eq!(xor_checksum(&[]), 0);
        assert_eq!(xor_checksum(&[0x82, 0x01]), 0x83);
        assert_eq!(additive_checksum(&[0xFF, 0x02]), 0x01);
    }

    #[test]
    fn test_range_is_clipped() {
        let ck = Checksum::XorOverRange { start: 2, end: 100 };
        assert_eq!(ck.range(5), 2..5);
        assert_eq!(ck.range(1), 1..1);
    }

    #[test]
    fn test_seal_then_verify() {
        let ck = Checksum::AdditiveOverRange { start: 1, end: 3 };
        let mut packet = [9, 200, 100, 0];
        ck.seal(&mut packet, 3);
        assert_eq!(packet[3], 44);
        assert!(ck.verify(&packet, 3).is_ok());
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let ck = Checksum::XorOverRange { start: 0, end: 2 };
        let err = ck.verify(&[1, 2, 0], 2).unwrap_err();
        assert_eq!(err, ProtocolError::ChecksumMismatch { expected: 3, actual: 0 });
    }

    #[test]
    fn test_verify_missing_trailer() {
        let ck = Checksum::XorOverRange { start: 0, end: 2 };
        assert!(matches!(ck.verify(&[1, 2], 2), Err(ProtocolError::FrameLength { .. })));
    }
}
