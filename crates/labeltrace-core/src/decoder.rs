//! Optical code decoding contract
//!
//! The decoding algorithm itself lives outside this crate. The controller
//! calls it synchronously, once per tick, and treats it as side-effect free.

use crate::frame::Frame;
use chrono::{DateTime, Utc};

/// Raw string decoded from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    /// Timestamp of the frame it was decoded from
    pub frame_time: DateTime<Utc>,
}

impl DecodedPayload {
    #[must_use]
    pub fn new(text: impl Into<String>, frame_time: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            frame_time,
        }
    }
}

/// Pixel buffer to payload.
///
/// `None` means "no code in this frame", the common case, never an error.
#[cfg_attr(test, mockall::automock)]
pub trait CodeDecoder: Send {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;
}

impl<T: CodeDecoder + ?Sized> CodeDecoder for Box<T> {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
        (**self).decode(pixels, width, height)
    }
}

/// Decode a frame, discarding empty payloads
pub fn decode_frame<D: CodeDecoder + ?Sized>(decoder: &D, frame: &Frame) -> Option<DecodedPayload> {
    decoder
        .decode(&frame.pixels, frame.width, frame.height)
        .filter(|text| !text.trim().is_empty())
        .map(|text| DecodedPayload::new(text, frame.captured_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn payload_carries_frame_time() {
        let frame = Frame::blank(2, 2);
        let mut decoder = MockCodeDecoder::new();
        decoder
            .expect_decode()
            .withf(|_, w, h| *w == 2 && *h == 2)
            .returning(|_, _, _| Some("ABC123".to_string()));

        let payload = decode_frame(&decoder, &frame).unwrap();
        assert_eq!(payload.text, "ABC123");
        assert_eq!(payload.frame_time, frame.captured_at);
    }

    #[test]
    fn blank_payload_is_a_miss() {
        let frame = Frame::blank(1, 1);
        let mut decoder = MockCodeDecoder::new();
        decoder
            .expect_decode()
            .with(mockall::predicate::always(), eq(1), eq(1))
            .returning(|_, _, _| Some("  ".to_string()));

        assert!(decode_frame(&decoder, &frame).is_none());
    }
}
