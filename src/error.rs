//! Error types returned across the engine's component boundaries.

use thiserror::Error;

/// Errors surfaced by [`crate::gpu`], [`crate::buffer_pool`], [`crate::capture`],
/// [`crate::upscaler`], [`crate::interpolate`] and [`crate::pipeline`].
///
/// Internal plumbing uses `anyhow::Result` for multi-step fallible helpers;
/// this enum is what crosses a component's public API.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no suitable GPU adapter found")]
    NoSuitableAdapter,

    #[error("capture target not found: {0}")]
    TargetNotFound(String),

    #[error("invalid capture region: {0}")]
    InvalidRegion(String),

    #[error("invalid dimensions: width and height must both be non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("vendor neural upscaler unavailable on this system")]
    VendorUnavailable,

    #[error("out of VRAM: requested {requested_mb}MB, {available_mb}MB available")]
    OutOfVram { requested_mb: u64, available_mb: u64 },

    #[error("GPU operation timed out")]
    GpuTimeout,

    #[error("GPU device was lost")]
    DeviceLost,

    #[error("frame dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        a_width: u32,
        a_height: u32,
        b_width: u32,
        b_height: u32,
    },

    #[error("pipeline is not running")]
    PipelineNotRunning,

    #[error("operation cancelled")]
    CancellationRequested,

    #[error("failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}
