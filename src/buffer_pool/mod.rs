//! GPU buffer recycling, modeled on `nethercore_zx::graphics::texture_manager`'s
//! VRAM accounting and `nethercore_zx::graphics::buffer::GrowableBuffer`'s
//! buffer-lifecycle idiom.
//!
//! Buffers are handed out by [`BufferPool::acquire`] and must come back
//! through [`BufferPool::release`]. Releasing a buffer that isn't checked
//! out is a logic error in the caller and panics rather than silently
//! corrupting the pool's bookkeeping.

use std::sync::{Arc, Mutex};

use hashbrown::{HashMap, HashSet};

use crate::config::MemoryStrategy;
use crate::error::PipelineError;
use crate::gpu::GpuContext;

/// What a pooled buffer is used for. Buffers of different kinds are never
/// reused for each other even if the size matches, since their `wgpu::BufferUsages`
/// differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    StagingUpload,
    StagingDownload,
    Storage,
    Uniform,
}

impl BufferKind {
    fn usages(self) -> wgpu::BufferUsages {
        match self {
            BufferKind::StagingUpload => wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::MAP_WRITE,
            BufferKind::StagingDownload => {
                wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ
            }
            BufferKind::Storage => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
            }
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

/// A buffer checked out of the pool. Must be returned via [`BufferPool::release`].
pub struct PooledBuffer {
    id: BufferId,
    kind: BufferKind,
    size: u64,
    buffer: wgpu::Buffer,
}

impl PooledBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn id(&self) -> BufferId {
        self.id
    }
}

fn size_class(requested: u64) -> u64 {
    requested.max(1).next_power_of_two()
}

fn strategy_cap_bytes(strategy: MemoryStrategy, gpu: &GpuContext) -> u64 {
    const MB: u64 = 1024 * 1024;
    match strategy {
        MemoryStrategy::Aggressive => 2048 * MB,
        MemoryStrategy::Balanced => 1024 * MB,
        MemoryStrategy::Conservative => 512 * MB,
        MemoryStrategy::Minimal => 128 * MB,
        MemoryStrategy::Auto => {
            let stats = gpu.vram_stats();
            match stats.usage_percent() {
                Some(p) if p >= 90.0 => 512 * MB,
                Some(p) if p >= 75.0 => 1024 * MB,
                _ => 2048 * MB,
            }
        }
    }
}

struct PoolState {
    buckets: HashMap<(BufferKind, u64), Vec<wgpu::Buffer>>,
    in_flight: HashSet<BufferId>,
    next_id: u64,
    tracked_bytes: u64,
}

/// Cleanup policy for [`BufferPool::cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Drops every idle (not checked-out) buffer above a small fixed
    /// low-water mark per bucket, regardless of the pool's current strategy.
    /// Used when VRAM pressure needs relief right now.
    Shrink,
    /// Drops idle buffers down to a low-water mark derived from the pool's
    /// current [`MemoryStrategy`]: `Aggressive` keeps the largest free list,
    /// `Minimal` frees immediately, the rest fall in between.
    Strategy,
}

/// Fixed low-water mark used by [`CleanupPolicy::Shrink`]: every idle
/// buffer is released regardless of the pool's current strategy, for
/// immediate VRAM relief (e.g. retrying after an out-of-VRAM error).
const SHRINK_LOW_WATER: usize = 0;

fn strategy_low_water_mark(strategy: MemoryStrategy, gpu: &GpuContext) -> usize {
    match strategy {
        MemoryStrategy::Aggressive => 8,
        MemoryStrategy::Balanced => 4,
        MemoryStrategy::Conservative => 1,
        MemoryStrategy::Minimal => 0,
        MemoryStrategy::Auto => {
            let stats = gpu.vram_stats();
            match stats.usage_percent() {
                Some(p) if p >= 90.0 => 0,
                Some(p) if p >= 75.0 => 1,
                _ => 4,
            }
        }
    }
}

pub struct BufferPool {
    gpu: Arc<GpuContext>,
    strategy: Mutex<MemoryStrategy>,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(gpu: Arc<GpuContext>, strategy: MemoryStrategy) -> BufferPool {
        BufferPool {
            gpu,
            strategy: Mutex::new(strategy),
            state: Mutex::new(PoolState {
                buckets: HashMap::new(),
                in_flight: HashSet::new(),
                next_id: 0,
                tracked_bytes: 0,
            }),
        }
    }

    pub fn reconfigure(&self, strategy: MemoryStrategy) {
        tracing::debug!(?strategy, "buffer pool strategy reconfigured");
        *self.strategy.lock().unwrap() = strategy;
    }

    pub fn strategy(&self) -> MemoryStrategy {
        *self.strategy.lock().unwrap()
    }

    /// Total bytes the pool has allocated, whether idle or checked out.
    pub fn app_allocated_bytes(&self) -> u64 {
        self.state.lock().unwrap().tracked_bytes
    }

    pub fn acquire(&self, kind: BufferKind, requested_size: u64) -> Result<PooledBuffer, PipelineError> {
        let class = size_class(requested_size);
        let mut state = self.state.lock().unwrap();

        // Smallest bucket >= requested size, tie-break smallest.
        let found_class = state
            .buckets
            .keys()
            .filter(|(k, c)| *k == kind && *c >= class)
            .map(|(_, c)| *c)
            .min();

        let (buffer, actual_class) = if let Some(fc) = found_class {
            let bucket = state.buckets.get_mut(&(kind, fc)).unwrap();
            let buffer = bucket.pop().unwrap();
            if bucket.is_empty() {
                state.buckets.remove(&(kind, fc));
            }
            (buffer, fc)
        } else {
            let strategy = *self.strategy.lock().unwrap();
            let cap = strategy_cap_bytes(strategy, &self.gpu);
            if state.tracked_bytes + class > cap {
                let available_mb = cap.saturating_sub(state.tracked_bytes) / (1024 * 1024);
                return Err(PipelineError::OutOfVram {
                    requested_mb: class / (1024 * 1024),
                    available_mb,
                });
            }
            let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("upscale-engine pooled buffer"),
                size: class,
                usage: kind.usages(),
                mapped_at_creation: false,
            });
            state.tracked_bytes += class;
            self.gpu.track_allocation(class as i64);
            (buffer, class)
        };

        let id = BufferId(state.next_id);
        state.next_id += 1;
        state.in_flight.insert(id);

        Ok(PooledBuffer {
            id,
            kind,
            size: actual_class,
            buffer,
        })
    }

    pub fn release(&self, buf: PooledBuffer) {
        let mut state = self.state.lock().unwrap();
        if !state.in_flight.remove(&buf.id) {
            panic!(
                "BufferPool: double release of buffer {:?} ({:?}, {} bytes)",
                buf.id, buf.kind, buf.size
            );
        }

        if self.strategy() == MemoryStrategy::Minimal {
            state.tracked_bytes -= buf.size;
            self.gpu.track_allocation(-(buf.size as i64));
            drop(buf.buffer);
            return;
        }

        state
            .buckets
            .entry((buf.kind, buf.size))
            .or_default()
            .push(buf.buffer);
    }

    pub fn cleanup(&self, policy: CleanupPolicy) {
        let low_water = match policy {
            CleanupPolicy::Shrink => SHRINK_LOW_WATER,
            CleanupPolicy::Strategy => strategy_low_water_mark(self.strategy(), &self.gpu),
        };

        let mut state = self.state.lock().unwrap();
        let mut freed = 0u64;
        for ((_, class), bucket) in state.buckets.iter_mut() {
            while bucket.len() > low_water {
                bucket.pop();
                freed += class;
            }
        }
        state.buckets.retain(|_, b| !b.is_empty());
        state.tracked_bytes = state.tracked_bytes.saturating_sub(freed);
        self.gpu.track_allocation(-(freed as i64));
        tracing::debug!(?policy, low_water, freed_bytes = freed, "buffer pool cleaned up");
    }

    #[cfg(test)]
    pub(crate) fn in_flight_count(&self) -> usize {
        self.state.lock().unwrap().in_flight.len()
    }

    #[cfg(test)]
    pub(crate) fn mark_released_raw(&self, id: BufferId) -> bool {
        self.state.lock().unwrap().in_flight.remove(&id)
    }
}

#[cfg(test)]
mod tests;
