//! Deterministic procedural frame generator.
//!
//! There is no portable, dependency-free way to grab real desktop frames
//! (every OS capture API - DXGI duplication, the X11/Wayland portals,
//! ScreenCaptureKit - is a distinct platform SDK, analogous to the vendor
//! neural upscaler this crate also represents abstractly). This backend is
//! the one concrete [`super::CaptureBackend`] shipped: it produces a moving
//! gradient test pattern, and is what [`super::CaptureSource`] drives for
//! every [`crate::config::CaptureTarget`] in the absence of a platform hook.
//! Real per-OS capture is the extension seam `CaptureBackend` exists for.

use super::CaptureBackend;

pub struct SyntheticBackend {
    width: u32,
    height: u32,
    frame_index: u64,
    alive: bool,
}

impl SyntheticBackend {
    pub fn new(width: u32, height: u32) -> SyntheticBackend {
        SyntheticBackend {
            width,
            height,
            frame_index: 0,
            alive: true,
        }
    }

    /// Test-only hook simulating the capture target disappearing mid-session
    /// (window closed, process exited).
    #[cfg(test)]
    pub fn kill(&mut self) {
        self.alive = false;
    }
}

impl CaptureBackend for SyntheticBackend {
    fn poll(&mut self) -> Option<(Vec<u8>, u32, u32)> {
        if !self.alive {
            return None;
        }
        let mut bytes = vec![0u8; (self.width * self.height * 4) as usize];
        let shift = (self.frame_index % 256) as u8;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = ((y * self.width + x) * 4) as usize;
                bytes[idx] = x.wrapping_add(shift as u32) as u8;
                bytes[idx + 1] = y.wrapping_add(shift as u32) as u8;
                bytes[idx + 2] = shift;
                bytes[idx + 3] = 255;
            }
        }
        self.frame_index += 1;
        Some((bytes, self.width, self.height))
    }

    fn stop(&mut self) {
        self.alive = false;
    }
}
