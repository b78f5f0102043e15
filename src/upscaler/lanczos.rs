use std::sync::Arc;
use std::time::Duration;

use crate::buffer_pool::{BufferPool, CleanupPolicy};
use crate::config::{MemoryStrategy, Quality, UpscalerConfig};
use crate::error::PipelineError;
use crate::gpu::GpuContext;

use super::compute_core::{ComputeUpscalerCore, Kernel};
use super::{Upscaler, UpscaledFrame};

/// Separable-in-spirit Lanczos upscaler (evaluated as a single 2D kernel
/// pass). Tap count scales with quality tier via `Quality::lanczos_half_taps`.
pub struct LanczosUpscaler {
    core: ComputeUpscalerCore,
}

impl LanczosUpscaler {
    pub fn new(quality: Quality, adaptive_quality: bool) -> LanczosUpscaler {
        LanczosUpscaler {
            core: ComputeUpscalerCore::new(Kernel::Lanczos, quality, adaptive_quality),
        }
    }
}

impl Upscaler for LanczosUpscaler {
    fn initialize(&mut self, gpu: &GpuContext, config: &UpscalerConfig) -> Result<(), PipelineError> {
        self.core.initialize(gpu, config)
    }

    fn upscale(
        &mut self,
        gpu: &GpuContext,
        pool: &Arc<BufferPool>,
        rgba: &[u8],
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Result<UpscaledFrame, PipelineError> {
        self.core.upscale(gpu, pool, rgba, width, height, sequence)
    }

    fn record_frame_time(&mut self, elapsed: Duration, target_fps: u32) {
        let budget = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
        self.core.quality_controller_mut().observe(elapsed, budget);
    }

    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn current_quality(&self) -> Quality {
        self.core.current_quality()
    }

    fn set_memory_strategy(&mut self, _strategy: MemoryStrategy) {}

    fn set_adaptive_quality(&mut self, enabled: bool) {
        self.core.quality_controller_mut().set_enabled(enabled);
    }

    fn force_cleanup(&mut self, pool: &Arc<BufferPool>) {
        pool.cleanup(CleanupPolicy::Strategy);
    }
}
