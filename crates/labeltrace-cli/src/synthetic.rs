//! Synthetic camera and decoder for `simulate`

use labeltrace_core::{CodeDecoder, Frame, FrameSource, ScanError};
use std::sync::atomic::{AtomicU32, Ordering};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

/// Camera that always produces a blank frame once started
#[derive(Debug, Default)]
pub struct SyntheticCamera {
    running: bool,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSource for SyntheticCamera {
    fn start(&mut self) -> Result<(), ScanError> {
        tracing::debug!("synthetic camera started");
        self.running = true;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame, ScanError> {
        if !self.running {
            return Err(ScanError::DeviceUnavailable("camera not started".into()));
        }
        Ok(Frame::blank(FRAME_WIDTH, FRAME_HEIGHT))
    }

    fn stop(&mut self) {
        if self.running {
            tracing::debug!("synthetic camera stopped");
        }
        self.running = false;
    }
}

/// Decoder that reports `payload` on one chosen call and misses otherwise
#[derive(Debug)]
pub struct ScriptedPayload {
    payload: String,
    detect_on: u32,
    calls: AtomicU32,
}

impl ScriptedPayload {
    /// `detect_on` is 1-based
    pub fn new(payload: impl Into<String>, detect_on: u32) -> Self {
        Self {
            payload: payload.into(),
            detect_on: detect_on.max(1),
            calls: AtomicU32::new(0),
        }
    }
}

impl CodeDecoder for ScriptedPayload {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        (call == self.detect_on).then(|| self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_needs_start() {
        let mut camera = SyntheticCamera::new();
        assert!(camera.capture_frame().is_err());
        camera.start().unwrap();
        let frame = camera.capture_frame().unwrap();
        assert_eq!(frame.width, FRAME_WIDTH);
        camera.stop();
        assert!(camera.capture_frame().is_err());
    }

    #[test]
    fn payload_on_chosen_call_only() {
        let decoder = ScriptedPayload::new("BATCH77", 2);
        assert_eq!(decoder.decode(&[], 0, 0), None);
        assert_eq!(decoder.decode(&[], 0, 0).as_deref(), Some("BATCH77"));
        assert_eq!(decoder.decode(&[], 0, 0), None);
    }
}
