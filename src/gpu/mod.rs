//! GPU adapter/device/queue ownership, modeled on
//! `nethercore_zx::graphics::ZGraphics`'s device setup and
//! `nethercore_core::capture::CaptureSupport`'s device/queue accessors.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::backend_override_from_env;
use crate::error::PipelineError;

/// GPU capabilities the rest of the engine probes before relying on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuFeature {
    TimestampQueries,
    Float16Storage,
}

/// Static adapter identity, read once at construction.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub backend: wgpu::Backend,
}

/// Best-effort VRAM accounting. `total_mb` is `None` when the active backend
/// exposes no portable way to query physical VRAM size (true of most wgpu
/// backends today); `app_allocated_mb` is always accurate since it's tracked
/// by [`crate::buffer_pool::BufferPool`] itself rather than queried from the
/// driver, the same fallback `core::capture`'s screenshot path implicitly
/// relies on (it never queries VRAM size, only works against what it holds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VramStats {
    pub total_mb: Option<u64>,
    pub app_allocated_mb: u64,
}

impl VramStats {
    pub fn usage_percent(&self) -> Option<f32> {
        self.total_mb
            .filter(|&t| t > 0)
            .map(|t| (self.app_allocated_mb as f32 / t as f32) * 100.0)
    }

    /// Bytes this engine has allocated. Same as `app_allocated_mb`; the
    /// portable "used" figure the spec asks for when no platform-wide VRAM
    /// query is available.
    pub fn used_mb(&self) -> u64 {
        self.app_allocated_mb
    }

    /// Physical VRAM remaining, when `total_mb` is known. Falls back to
    /// `app_allocated_mb` (i.e. reports nothing free beyond what's tracked)
    /// when the backend exposes no physical VRAM size.
    pub fn free_mb(&self) -> u64 {
        match self.total_mb {
            Some(total) => total.saturating_sub(self.app_allocated_mb),
            None => self.app_allocated_mb,
        }
    }
}

/// Owns the wgpu adapter, device and queue shared by every other component.
pub struct GpuContext {
    adapter_info: AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    features: wgpu::Features,
    /// Bytes the engine itself has allocated via the buffer pool and
    /// upscaler/interpolator textures. Updated by [`crate::buffer_pool::BufferPool`].
    app_allocated_bytes: AtomicU64,
}

impl GpuContext {
    /// Probes for a suitable adapter and opens a device. Blocks on the
    /// async wgpu request path via `pollster`, matching every adapter/device
    /// request in the graphics-backend ancestor of this module.
    pub fn probe() -> Result<GpuContext, PipelineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backend_override_from_env(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|_| PipelineError::NoSuitableAdapter)?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("upscale-engine device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))?;

        let features = device.features();

        Ok(GpuContext {
            adapter_info: AdapterInfo {
                name: info.name,
                vendor: info.vendor,
                backend: info.backend,
            },
            device,
            queue,
            features,
            app_allocated_bytes: AtomicU64::new(0),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter_info
    }

    pub fn supports(&self, feature: GpuFeature) -> bool {
        match feature {
            GpuFeature::TimestampQueries => {
                self.features.contains(wgpu::Features::TIMESTAMP_QUERY)
            }
            GpuFeature::Float16Storage => self.features.contains(wgpu::Features::SHADER_F16),
        }
    }

    pub(crate) fn track_allocation(&self, delta_bytes: i64) {
        if delta_bytes >= 0 {
            self.app_allocated_bytes
                .fetch_add(delta_bytes as u64, Ordering::Relaxed);
        } else {
            self.app_allocated_bytes
                .fetch_sub((-delta_bytes) as u64, Ordering::Relaxed);
        }
    }

    pub fn vram_stats(&self) -> VramStats {
        VramStats {
            total_mb: None,
            app_allocated_mb: self.app_allocated_bytes.load(Ordering::Relaxed) / (1024 * 1024),
        }
    }
}
