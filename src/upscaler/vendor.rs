use std::sync::Arc;
use std::time::Duration;

use crate::buffer_pool::BufferPool;
use crate::config::{MemoryStrategy, Quality, UpscalerConfig};
use crate::error::PipelineError;
use crate::gpu::GpuContext;

use super::quality_controller::AdaptiveQualityController;
use super::{Upscaler, UpscaledFrame};

/// Seam for a proprietary neural upscaling SDK (DLSS/FSR/XeSS-class).
/// This crate does not bind one: `initialize` always fails with
/// `VendorUnavailable`, and `select_best`/the pipeline coordinator fall
/// back to `Lanczos` the same way `nu_scaler`'s Python layer fell back when
/// its vendor backend wasn't present on a machine. A real deployment would
/// replace this module's body with FFI/SDK bindings while keeping this
/// same trait surface.
pub struct VendorNeuralUpscaler {
    quality: AdaptiveQualityController,
}

impl VendorNeuralUpscaler {
    pub fn new(quality: Quality, adaptive_quality: bool) -> VendorNeuralUpscaler {
        VendorNeuralUpscaler {
            quality: AdaptiveQualityController::new(quality, adaptive_quality),
        }
    }
}

impl Upscaler for VendorNeuralUpscaler {
    fn initialize(&mut self, _gpu: &GpuContext, _config: &UpscalerConfig) -> Result<(), PipelineError> {
        tracing::warn!("vendor neural upscaler requested but no vendor SDK is bound into this build");
        Err(PipelineError::VendorUnavailable)
    }

    fn upscale(
        &mut self,
        _gpu: &GpuContext,
        _pool: &Arc<BufferPool>,
        _rgba: &[u8],
        _width: u32,
        _height: u32,
        _sequence: u64,
    ) -> Result<UpscaledFrame, PipelineError> {
        Err(PipelineError::VendorUnavailable)
    }

    fn record_frame_time(&mut self, elapsed: Duration, target_fps: u32) {
        let budget = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
        self.quality.observe(elapsed, budget);
    }

    fn name(&self) -> &'static str {
        "vendor-neural"
    }

    fn current_quality(&self) -> Quality {
        self.quality.current()
    }

    fn set_memory_strategy(&mut self, _strategy: MemoryStrategy) {}

    fn set_adaptive_quality(&mut self, enabled: bool) {
        self.quality.set_enabled(enabled);
    }
}
