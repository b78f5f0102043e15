//! The external sink interface: what a host receives from a running
//! pipeline.

use std::sync::Arc;

/// Whether an [`OutputFrame`] was produced directly by the upscaler or
/// synthesized in between two upscaled frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Upscaled,
    Interpolated,
}

/// Per-frame timing, reported alongside each delivered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub end_to_end_ms: f32,
    pub gpu_ms: Option<f32>,
}

/// One frame delivered to the host's sink callback.
#[derive(Clone)]
pub struct OutputFrame {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub source_sequence: u64,
    pub kind: OutputKind,
    pub timings: Timings,
}
