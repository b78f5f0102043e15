//! Capture subsystem: produces timestamped RGBA8 frames from a capture
//! target. Modeled on `nethercore_core::capture::ScreenCapture`'s state
//! machine and `read_render_target_pixels`'s readback shape, adapted to a
//! pollable source rather than a one-shot screenshot.

mod synthetic;

pub use synthetic::SyntheticBackend;

use std::time::Instant;

use crate::config::CaptureTarget;
use crate::error::PipelineError;

/// One captured frame, owned by exactly one caller until it's handed to an
/// upscale task.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    pub captured_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Capturing,
}

/// Seam for platform-specific capture implementations. The shipped
/// implementation is [`SyntheticBackend`]; a native backend (DXGI, PipeWire,
/// ScreenCaptureKit) would implement this trait and be selected in
/// [`CaptureSource::start`].
pub(crate) trait CaptureBackend: Send {
    fn poll(&mut self) -> Option<(Vec<u8>, u32, u32)>;
    fn stop(&mut self);
}

/// Best-effort window enumerator. The default, [`NullWindowEnumerator`],
/// reports no windows (true of headless hosts); tests use
/// [`StaticWindowEnumerator`] to exercise target validation deterministically.
pub(crate) trait WindowEnumerator: Send {
    fn list(&self) -> Vec<String>;
    fn pid_exists(&self, pid: u32) -> bool;
}

pub(crate) struct NullWindowEnumerator;

impl WindowEnumerator for NullWindowEnumerator {
    fn list(&self) -> Vec<String> {
        Vec::new()
    }

    fn pid_exists(&self, _pid: u32) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) struct StaticWindowEnumerator {
    pub titles: Vec<String>,
    pub pids: Vec<u32>,
}

#[cfg(test)]
impl WindowEnumerator for StaticWindowEnumerator {
    fn list(&self) -> Vec<String> {
        self.titles.clone()
    }

    fn pid_exists(&self, pid: u32) -> bool {
        self.pids.contains(&pid)
    }
}

const DEFAULT_VIRTUAL_DESKTOP: (u32, u32) = (7680, 4320);

/// Polls a capture target for RGBA8 frames. Backend selection is opaque to
/// callers: construct, `start(target)`, `poll()` in a loop, `stop()`.
pub struct CaptureSource {
    state: CaptureState,
    backend: Option<Box<dyn CaptureBackend>>,
    enumerator: Box<dyn WindowEnumerator>,
    virtual_desktop: (u32, u32),
    next_sequence: u64,
}

impl CaptureSource {
    pub fn new() -> CaptureSource {
        CaptureSource {
            state: CaptureState::Idle,
            backend: None,
            enumerator: Box::new(NullWindowEnumerator),
            virtual_desktop: DEFAULT_VIRTUAL_DESKTOP,
            next_sequence: 0,
        }
    }

    pub fn with_virtual_desktop_bounds(mut self, width: u32, height: u32) -> CaptureSource {
        self.virtual_desktop = (width, height);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_enumerator(mut self, enumerator: Box<dyn WindowEnumerator>) -> CaptureSource {
        self.enumerator = enumerator;
        self
    }

    /// Best-effort enumeration; may be empty on headless systems.
    pub fn list_windows(&self) -> Vec<String> {
        self.enumerator.list()
    }

    pub fn start(&mut self, target: CaptureTarget) -> Result<(), PipelineError> {
        let backend: Box<dyn CaptureBackend> = match &target {
            CaptureTarget::FullScreen => {
                Box::new(SyntheticBackend::new(self.virtual_desktop.0, self.virtual_desktop.1))
            }
            CaptureTarget::WindowByTitle(title) => {
                if !self.enumerator.list().iter().any(|t| t == title) {
                    return Err(PipelineError::TargetNotFound(title.clone()));
                }
                Box::new(SyntheticBackend::new(1920, 1080))
            }
            CaptureTarget::WindowByPid(pid) => {
                if !self.enumerator.pid_exists(*pid) {
                    return Err(PipelineError::TargetNotFound(format!("pid {pid}")));
                }
                Box::new(SyntheticBackend::new(1920, 1080))
            }
            CaptureTarget::Region { x, y, width, height } => {
                if *width == 0 || *height == 0 {
                    return Err(PipelineError::InvalidRegion(
                        "region width and height must be non-zero".into(),
                    ));
                }
                let (vw, vh) = self.virtual_desktop;
                let right = *x as i64 + *width as i64;
                let bottom = *y as i64 + *height as i64;
                if *x < 0 || *y < 0 || right > vw as i64 || bottom > vh as i64 {
                    return Err(PipelineError::InvalidRegion(format!(
                        "region ({x},{y},{width}x{height}) falls outside the {vw}x{vh} virtual desktop"
                    )));
                }
                Box::new(SyntheticBackend::new(*width, *height))
            }
        };

        self.backend = Some(backend);
        self.next_sequence = 0;
        self.state = CaptureState::Capturing;
        tracing::info!(?target, "capture started");
        Ok(())
    }

    /// Returns the next frame if one is available. `None` means either no
    /// new frame yet, or the target has disappeared (window closed,
    /// process exited) - both are non-fatal; the caller just polls again
    /// or calls `stop`.
    pub fn poll(&mut self) -> Option<RawFrame> {
        if self.state != CaptureState::Capturing {
            return None;
        }
        let backend = self.backend.as_mut()?;
        let (bytes, width, height) = backend.poll()?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(RawFrame {
            bytes,
            width,
            height,
            sequence,
            captured_at: Instant::now(),
        })
    }

    pub fn stop(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.stop();
        }
        self.backend = None;
        self.state = CaptureState::Idle;
        tracing::info!("capture stopped");
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }
}

impl Default for CaptureSource {
    fn default() -> CaptureSource {
        CaptureSource::new()
    }
}

#[cfg(test)]
mod tests;
