//! Real-time GPU screen/video upscaling and frame-interpolation pipeline engine.
//!
//! The engine continuously acquires RGBA frames from a [`capture::CaptureSource`],
//! routes them through a GPU-resident [`upscaler::Upscaler`], optionally
//! synthesizes in-between frames with the [`interpolate::FrameInterpolator`],
//! and delivers the result to a host-registered sink callback through the
//! [`pipeline::PipelineCoordinator`].
//!
//! This crate owns the pipeline engine only: capture, GPU resource
//! management, upscaling, interpolation, and the concurrency coordinator
//! that wires them together. A desktop GUI, benchmark reporting, and
//! packaging are external collaborators that consume this crate's public
//! API (`PipelineCoordinator::subscribe`, `PipelineCoordinator::stats`).

pub mod buffer_pool;
pub mod capture;
pub mod config;
pub mod error;
pub mod gpu;
pub mod interpolate;
pub mod output;
pub mod pipeline;
pub mod telemetry;
pub mod upscaler;

#[cfg(test)]
mod reference;

pub use buffer_pool::{BufferKind, BufferPool, PooledBuffer};
pub use capture::{CaptureSource, RawFrame};
pub use config::{
    CaptureTarget, MemoryStrategy, PipelineConfig, PipelineConfigBuilder, Quality, ScaleAlgorithm,
    UpscalerConfig,
};
pub use error::PipelineError;
pub use gpu::{AdapterInfo, GpuContext, GpuFeature, VramStats};
pub use interpolate::{FrameInterpolator, InterpolatedFrame};
pub use output::{OutputFrame, OutputKind, Timings};
pub use pipeline::{PipelineCoordinator, PipelineState};
pub use telemetry::{Telemetry, TelemetrySnapshot};
pub use upscaler::{UpscaledFrame, Upscaler, select_best};
