//! Upscaling algorithms, exposed behind one trait so the pipeline can swap
//! implementations without knowing which one is active. Optional
//! capabilities (VRAM stats, memory strategy, forced GPU activation) are
//! plain `Option`-returning trait methods rather than duck-typed probing -
//! the redesign this engine keeps over the `hasattr(upscaler, "...")` style
//! of the Python project it's descended from.

mod bilinear;
mod compute_core;
mod lanczos;
mod nearest;
mod quality_controller;
mod shaders;
mod vendor;

pub use bilinear::BilinearUpscaler;
pub use lanczos::LanczosUpscaler;
pub use nearest::NearestUpscaler;
pub use vendor::VendorNeuralUpscaler;

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::config::{Quality, ScaleAlgorithm, UpscalerConfig};
use crate::error::PipelineError;
use crate::gpu::{AdapterInfo, GpuContext, VramStats};

/// An upscaled frame, ready for delivery or for use as an interpolation
/// input. Bytes are `Arc`-shared since the pipeline retains the previous
/// frame for interpolation without copying it.
#[derive(Clone)]
pub struct UpscaledFrame {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub source_sequence: u64,
    pub upscaler_name: &'static str,
}

/// A GPU-resident upscaling algorithm.
pub trait Upscaler: Send {
    /// Builds (or rebuilds, if dimensions changed) the GPU pipeline and
    /// textures this upscaler needs. Idempotent when called again with the
    /// same dimensions.
    fn initialize(&mut self, gpu: &GpuContext, config: &UpscalerConfig) -> Result<(), PipelineError>;

    /// Upscales one raw RGBA8 frame. `width`/`height` must match the
    /// dimensions passed to the most recent `initialize` call.
    fn upscale(
        &mut self,
        gpu: &GpuContext,
        pool: &Arc<BufferPool>,
        rgba: &[u8],
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Result<UpscaledFrame, PipelineError>;

    /// Feeds one frame's end-to-end wall time to the adaptive quality
    /// controller, if adaptive quality is enabled.
    fn record_frame_time(&mut self, elapsed: std::time::Duration, target_fps: u32);

    fn name(&self) -> &'static str;

    fn current_quality(&self) -> Quality;

    // --- optional capabilities, default to inert no-ops / None ---

    fn set_memory_strategy(&mut self, _strategy: crate::config::MemoryStrategy) {}

    fn set_adaptive_quality(&mut self, _enabled: bool) {}

    fn get_vram_stats(&self, _gpu: &GpuContext) -> Option<VramStats> {
        None
    }

    fn get_gpu_info(&self, _gpu: &GpuContext) -> Option<AdapterInfo> {
        None
    }

    fn update_gpu_stats(&mut self, _gpu: &GpuContext) {}

    /// Releases idle pooled buffers this upscaler's previous work left
    /// behind. The default is an inert no-op; implementations that actually
    /// acquire pooled buffers during `upscale` should override this to call
    /// [`BufferPool::cleanup`].
    fn force_cleanup(&mut self, _pool: &Arc<BufferPool>) {}

    /// Pre-warms GPU pipelines for a handful of common resolutions by
    /// running one real upscale at each, then releases the buffers those
    /// dry runs left idle in the pool. Ported from the original project's
    /// `gpu_optimizer.force_gpu_activation`.
    fn force_gpu_activation(&mut self, gpu: &GpuContext, pool: &Arc<BufferPool>) -> Result<(), PipelineError> {
        const COMMON_RESOLUTIONS: [(u32, u32); 3] = [(1920, 1080), (2560, 1440), (3840, 2160)];
        for (w, h) in COMMON_RESOLUTIONS {
            let config = UpscalerConfig {
                input_width: w,
                input_height: h,
                output_width: w * 2,
                output_height: h * 2,
                quality: self.current_quality(),
                memory_strategy: crate::config::MemoryStrategy::Auto,
                adaptive_quality: false,
            };
            self.initialize(gpu, &config)?;
            let dummy = vec![0u8; (w as usize) * (h as usize) * 4];
            self.upscale(gpu, pool, &dummy, w, h, 0)?;
            self.force_cleanup(pool);
        }
        Ok(())
    }
}

/// Picks the best available algorithm for a configuration, preferring the
/// vendor neural path when it's both requested-or-better and actually
/// available, falling back through lanczos and bilinear to nearest.
pub fn select_best(config: &UpscalerConfig, vendor_available: bool) -> ScaleAlgorithm {
    if vendor_available && matches!(config.quality, Quality::Ultra | Quality::Quality) {
        return ScaleAlgorithm::VendorNeural;
    }
    match config.quality {
        Quality::Ultra | Quality::Quality => ScaleAlgorithm::Lanczos,
        Quality::Balanced => ScaleAlgorithm::Bilinear,
        Quality::Performance => ScaleAlgorithm::Nearest,
    }
}

/// Constructs the concrete upscaler for an algorithm selection.
pub fn build(algorithm: ScaleAlgorithm, quality: Quality, adaptive_quality: bool) -> Box<dyn Upscaler> {
    match algorithm {
        ScaleAlgorithm::Nearest => Box::new(NearestUpscaler::new(quality, adaptive_quality)),
        ScaleAlgorithm::Bilinear => Box::new(BilinearUpscaler::new(quality, adaptive_quality)),
        ScaleAlgorithm::Lanczos => Box::new(LanczosUpscaler::new(quality, adaptive_quality)),
        ScaleAlgorithm::VendorNeural => Box::new(VendorNeuralUpscaler::new(quality, adaptive_quality)),
    }
}

#[cfg(test)]
mod tests;
