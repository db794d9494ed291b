//! Camera frame acquisition
//!
//! `FrameSource` abstracts a live camera feed. It never buffers history:
//! `capture_frame` always hands back the latest frame.

use crate::error::ScanError;
use chrono::{DateTime, Utc};

/// One captured frame as a packed pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixel data, row-major
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Create a frame stamped with the current time
    #[must_use]
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at: Utc::now(),
        }
    }

    /// Blank RGBA frame of the given size
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self::new(vec![0; len], width, height)
    }

    /// Number of pixels
    #[inline]
    #[must_use]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Live camera feed.
///
/// Implementations map permission-denied and missing-device conditions to
/// `ScanError::DeviceUnavailable`. Before the first frame arrives,
/// `capture_frame` returns `ScanError::NoFrameAvailable`.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource: Send {
    /// Acquire the camera device
    fn start(&mut self) -> Result<(), ScanError>;

    /// Most recent frame
    fn capture_frame(&mut self) -> Result<Frame, ScanError>;

    /// Release the device. Idempotent.
    fn stop(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn start(&mut self) -> Result<(), ScanError> {
        (**self).start()
    }

    fn capture_frame(&mut self) -> Result<Frame, ScanError> {
        (**self).capture_frame()
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}
