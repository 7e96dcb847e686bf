//! Splits the inbound byte stream into frames.
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Decoder turning raw transport bytes into frames.
///
/// With a delimiter, bytes accumulate until an exact delimiter match and the
/// delimiter itself is stripped. Without one, every chunk read from the
/// transport is a frame of its own.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    delimiter: Option<Bytes>,
    max_frame_len: usize,
    trimmed: u64,
}

impl FrameCodec {
    pub fn new(delimiter: Option<&[u8]>, max_frame_len: usize) -> Self {
        Self {
            delimiter: delimiter.filter(|d| !d.is_empty()).map(Bytes::copy_from_slice),
            max_frame_len,
            trimmed: 0,
        }
    }

    pub fn delimited(delimiter: &[u8]) -> Self {
        Self::new(Some(delimiter), 8192)
    }

    pub fn raw() -> Self {
        Self::new(None, 8192)
    }

    pub fn delimiter(&self) -> Option<&[u8]> {
        self.delimiter.as_deref()
    }

    /// Number of times the accumulator overflowed and old bytes were dropped.
    pub fn trimmed(&self) -> u64 {
        self.trimmed
    }
}

/// Position of the first exact occurrence of `needle` in `haystack`.
pub fn find_delimiter(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        let Some(delimiter) = self.delimiter.as_ref() else {
            if src.is_empty() {
                return Ok(None);
            }
            return Ok(Some(src.split().freeze()));
        };

        if let Some(pos) = find_delimiter(src, delimiter) {
            let frame = src.split_to(pos).freeze();
            src.advance(delimiter.len());
            return Ok(Some(frame));
        }

        // Keep the tail that could still be the start of a delimiter.
        if src.len() > self.max_frame_len {
            let excess = src.len() - self.max_frame_len;
            src.advance(excess);
            self.trimmed += 1;
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Ok(Some(src.split().freeze())),
        }
    }
}
