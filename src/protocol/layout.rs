use super::checksum::Checksum;

/// Inbound frame layout of one device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Byte sequence separating frames on the wire.
    pub delimiter: Option<&'static [u8]>,
    /// Exact frame length, when the family sends fixed-size frames.
    pub expected_len: Option<usize>,
    /// Number of leading bytes that carry pin values.
    pub pin_count: usize,
    pub checksum: Option<Checksum>,
    /// Index of the checksum trailer byte.
    pub checksum_offset: usize,
}

pub const MICROBIT_DELIMITER: &[u8] = &[0x0D, 0x0A];
pub const WISE_XBOARD_DELIMITER: &[u8] = &[0x52, 0x58, 0x3D, 0x00, 0x0E];
pub const WISE_XBOARD_PREMIUM_DELIMITER: &[u8] = &[0x23, 0x08, 0x00];

/// micro:bit streams lines of raw analog bytes, 5 pins, no checksum.
pub const MICROBIT: FrameLayout = FrameLayout {
    delimiter: Some(MICROBIT_DELIMITER),
    expected_len: None,
    pin_count: 5,
    checksum: None,
    checksum_offset: 0,
};

/// wiseXboard telemetry: 5 pin bytes after each `RX=` marker, no checksum.
pub const WISE_XBOARD: FrameLayout = FrameLayout {
    delimiter: Some(WISE_XBOARD_DELIMITER),
    expected_len: None,
    pin_count: 5,
    checksum: None,
    checksum_offset: 0,
};

/// wiseXboardPremium telemetry: 7 pin bytes and their XOR.
pub const WISE_XBOARD_PREMIUM: FrameLayout = FrameLayout {
    delimiter: Some(WISE_XBOARD_PREMIUM_DELIMITER),
    expected_len: Some(8),
    pin_count: 7,
    checksum: Some(Checksum::XorOverRange { start: 0, end: 7 }),
    checksum_offset: 7,
};
