//! Configuration surface: everything a host supplies to start a pipeline.
//!
//! There is no file-backed configuration and no persisted state between
//! runs; the host builds a [`PipelineConfig`] in memory each session. The
//! only environment variable the engine reads is `UPSCALE_ENGINE_BACKEND`,
//! an optional override of wgpu backend selection (`auto` by default).

use std::env;

/// Upscaling algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleAlgorithm {
    Nearest,
    Bilinear,
    Lanczos,
    VendorNeural,
}

/// Output quality tier. Higher tiers spend more GPU time per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    Performance,
    Balanced,
    Quality,
    Ultra,
}

impl Quality {
    /// One tier down, saturating at `Performance`.
    pub fn step_down(self) -> Quality {
        match self {
            Quality::Ultra => Quality::Quality,
            Quality::Quality => Quality::Balanced,
            Quality::Balanced => Quality::Performance,
            Quality::Performance => Quality::Performance,
        }
    }

    /// One tier up, saturating at `Ultra`.
    pub fn step_up(self) -> Quality {
        match self {
            Quality::Performance => Quality::Balanced,
            Quality::Balanced => Quality::Quality,
            Quality::Quality => Quality::Ultra,
            Quality::Ultra => Quality::Ultra,
        }
    }

    /// Lanczos half-width (number of taps on each side of the kernel center)
    /// used at this tier. Nearest and bilinear ignore this.
    pub fn lanczos_half_taps(self) -> u32 {
        match self {
            Quality::Ultra | Quality::Quality => 3,
            Quality::Balanced => 2,
            Quality::Performance => 1,
        }
    }
}

/// How aggressively [`crate::buffer_pool::BufferPool`] retains idle GPU buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStrategy {
    /// Chooses Aggressive/Balanced/Conservative from live VRAM pressure.
    Auto,
    Aggressive,
    Balanced,
    Conservative,
    /// Releases every buffer as soon as it's returned to the pool.
    Minimal,
}

/// What a [`crate::capture::CaptureSource`] should capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    FullScreen,
    WindowByTitle(String),
    WindowByPid(u32),
    Region { x: i32, y: i32, width: u32, height: u32 },
}

/// Upscaler construction parameters, shared by all algorithm implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscalerConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub quality: Quality,
    pub memory_strategy: MemoryStrategy,
    pub adaptive_quality: bool,
}

impl UpscalerConfig {
    pub fn scale_factor_x(&self) -> f32 {
        self.output_width as f32 / self.input_width as f32
    }

    pub fn scale_factor_y(&self) -> f32 {
        self.output_height as f32 / self.input_height as f32
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub target: CaptureTarget,
    pub algorithm: ScaleAlgorithm,
    pub quality: Quality,
    /// Output / input ratio, clamped to `[1.0, 4.0]`. Output dimensions are
    /// derived per capture frame as `round(frame.width * scale)` /
    /// `round(frame.height * scale)` rather than fixed ahead of time, so a
    /// capture source that changes size keeps scaling proportionally.
    pub scale: f32,
    pub worker_count: usize,
    pub memory_strategy: MemoryStrategy,
    pub adaptive_quality: bool,
    pub enable_interpolation: bool,
    pub target_fps: u32,
}

/// Lower/upper bounds for [`PipelineConfig::scale`].
pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 4.0;

/// Lower/upper bounds for [`PipelineConfig::worker_count`].
pub const MIN_WORKER_COUNT: usize = 1;
pub const MAX_WORKER_COUNT: usize = 16;

/// Computes `round(dimension * scale)`, the output-size law every upscaler
/// implementation must satisfy.
pub fn scaled_dimension(dimension: u32, scale: f32) -> u32 {
    (dimension as f32 * scale).round() as u32
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for [`PipelineConfig`], mirroring the builder pattern used by
/// this engine's graphics-backend ancestor for runtime settings.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    target: CaptureTarget,
    algorithm: ScaleAlgorithm,
    quality: Quality,
    scale: f32,
    worker_count: usize,
    memory_strategy: MemoryStrategy,
    adaptive_quality: bool,
    enable_interpolation: bool,
    target_fps: u32,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        PipelineConfigBuilder {
            target: CaptureTarget::FullScreen,
            algorithm: ScaleAlgorithm::Bilinear,
            quality: Quality::Balanced,
            scale: 2.0,
            worker_count: 1,
            memory_strategy: MemoryStrategy::Auto,
            adaptive_quality: false,
            enable_interpolation: false,
            target_fps: 60,
        }
    }
}

impl PipelineConfigBuilder {
    pub fn target(mut self, target: CaptureTarget) -> Self {
        self.target = target;
        self
    }

    pub fn algorithm(mut self, algorithm: ScaleAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Output / input ratio. Clamped to `[MIN_SCALE, MAX_SCALE]`.
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.clamp(MIN_WORKER_COUNT, MAX_WORKER_COUNT);
        self
    }

    pub fn memory_strategy(mut self, strategy: MemoryStrategy) -> Self {
        self.memory_strategy = strategy;
        self
    }

    pub fn adaptive_quality(mut self, enabled: bool) -> Self {
        self.adaptive_quality = enabled;
        self
    }

    pub fn enable_interpolation(mut self, enabled: bool) -> Self {
        self.enable_interpolation = enabled;
        self
    }

    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            target: self.target,
            algorithm: self.algorithm,
            quality: self.quality,
            scale: self.scale,
            worker_count: self.worker_count,
            memory_strategy: self.memory_strategy,
            adaptive_quality: self.adaptive_quality,
            enable_interpolation: self.enable_interpolation,
            target_fps: self.target_fps,
        }
    }
}

/// Backend override read from `UPSCALE_ENGINE_BACKEND` (`auto`, `vulkan`,
/// `metal`, `dx12`, `gl`). Unset or unrecognized falls back to `auto`.
pub fn backend_override_from_env() -> wgpu::Backends {
    match env::var("UPSCALE_ENGINE_BACKEND").ok().as_deref() {
        Some("vulkan") => wgpu::Backends::VULKAN,
        Some("metal") => wgpu::Backends::METAL,
        Some("dx12") => wgpu::Backends::DX12,
        Some("gl") => wgpu::Backends::GL,
        _ => wgpu::Backends::all(),
    }
}
