//! Ties capture, upscaling and interpolation together into a running,
//! concurrent pipeline. A capture thread fills a bounded drop-oldest queue;
//! a pool of worker threads drain it and upscale frames independently (so
//! completion order can differ from capture order); a delivery thread
//! reorders completions by sequence number, optionally interpolates between
//! consecutive frames, and calls the host's sink.

mod queue;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::buffer_pool::{BufferPool, CleanupPolicy};
use crate::capture::CaptureSource;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::gpu::GpuContext;
use crate::interpolate::FrameInterpolator;
use crate::output::{OutputFrame, OutputKind, Timings};
use crate::telemetry::{Telemetry, TelemetrySnapshot};
use crate::upscaler::{self, UpscaledFrame, Upscaler};

use queue::FrameQueue;

/// Lifecycle state of a [`PipelineCoordinator`]. Transitions:
/// `Idle -> Starting -> Running -> Stopping -> Idle`. A fatal GPU error
/// (`GpuTimeout`, `DeviceLost`, or an unrecoverable `VendorUnavailable`
/// fallback failure) moves `Running` directly to `Stopping`; a subsequent
/// `stop()` call reaps the threads and returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Starting,
    Running,
    Stopping,
}

type Sink = dyn Fn(OutputFrame) + Send + Sync;

enum WorkItem {
    Completed {
        sequence: u64,
        frame: UpscaledFrame,
        end_to_end_ms: f32,
        gpu_ms: f32,
        quality_tier: crate::config::Quality,
    },
    Dropped(u64),
    Fatal(PipelineError),
}

struct RunHandles {
    capture_handle: JoinHandle<()>,
    worker_handles: Vec<JoinHandle<()>>,
    delivery_handle: JoinHandle<()>,
    stop_flag: Arc<AtomicBool>,
    queue: Arc<FrameQueue>,
}

const WORKER_QUEUE_DEPTH_PER_WORKER: usize = 2;
const GRACE_PERIOD: Duration = Duration::from_secs(2);

pub struct PipelineCoordinator {
    gpu: Arc<GpuContext>,
    pool: Arc<BufferPool>,
    telemetry: Arc<Telemetry>,
    config: Mutex<Option<PipelineConfig>>,
    state: Arc<Mutex<PipelineState>>,
    sink: Arc<Mutex<Option<Arc<Sink>>>>,
    run: Mutex<Option<RunHandles>>,
}

impl PipelineCoordinator {
    pub fn new(gpu: Arc<GpuContext>, pool: Arc<BufferPool>) -> PipelineCoordinator {
        PipelineCoordinator {
            gpu,
            pool,
            telemetry: Arc::new(Telemetry::new()),
            config: Mutex::new(None),
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            sink: Arc::new(Mutex::new(None)),
            run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap()
    }

    pub fn configure(&self, config: PipelineConfig) -> Result<(), PipelineError> {
        if self.state() != PipelineState::Idle {
            return Err(PipelineError::PipelineNotRunning);
        }
        *self.config.lock().unwrap() = Some(config);
        Ok(())
    }

    /// Registers (replacing any previous) the callback that receives every
    /// delivered frame.
    pub fn subscribe<F>(&self, sink: F)
    where
        F: Fn(OutputFrame) + Send + Sync + 'static,
    {
        *self.sink.lock().unwrap() = Some(Arc::new(sink));
    }

    pub fn stats(&self) -> Arc<TelemetrySnapshot> {
        self.telemetry.snapshot()
    }

    pub fn start(&self) -> Result<(), PipelineError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != PipelineState::Idle {
                return Err(PipelineError::PipelineNotRunning);
            }
            *state = PipelineState::Starting;
        }

        let config = self
            .config
            .lock()
            .unwrap()
            .clone()
            .ok_or(PipelineError::PipelineNotRunning)?;

        let mut capture = CaptureSource::new();
        if let Err(e) = capture.start(config.target.clone()) {
            *self.state.lock().unwrap() = PipelineState::Idle;
            return Err(e);
        }

        let queue = Arc::new(FrameQueue::new(
            config.worker_count.max(1) * WORKER_QUEUE_DEPTH_PER_WORKER,
        ));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (results_tx, results_rx) = mpsc::channel::<WorkItem>();

        let capture_handle = {
            let queue = queue.clone();
            let stop_flag = stop_flag.clone();
            thread::Builder::new()
                .name("upscale-engine-capture".into())
                .spawn(move || capture_loop(capture, queue, stop_flag))
                .expect("failed to spawn capture thread")
        };

        let mut worker_handles = Vec::with_capacity(config.worker_count.max(1));
        for worker_id in 0..config.worker_count.max(1) {
            let gpu = self.gpu.clone();
            let pool = self.pool.clone();
            let queue = queue.clone();
            let stop_flag = stop_flag.clone();
            let results_tx = results_tx.clone();
            let state = self.state.clone();
            let config = config.clone();
            worker_handles.push(
                thread::Builder::new()
                    .name(format!("upscale-engine-worker-{worker_id}"))
                    .spawn(move || worker_loop(gpu, pool, queue, stop_flag, results_tx, state, config))
                    .expect("failed to spawn worker thread"),
            );
        }
        drop(results_tx);

        let delivery_handle = {
            let sink = self.sink.clone();
            let telemetry = self.telemetry.clone();
            let gpu = self.gpu.clone();
            let pool = self.pool.clone();
            let queue = queue.clone();
            let enable_interpolation = config.enable_interpolation;
            thread::Builder::new()
                .name("upscale-engine-delivery".into())
                .spawn(move || {
                    delivery_loop(results_rx, sink, telemetry, gpu, pool, queue, enable_interpolation)
                })
                .expect("failed to spawn delivery thread")
        };

        *self.run.lock().unwrap() = Some(RunHandles {
            capture_handle,
            worker_handles,
            delivery_handle,
            stop_flag,
            queue,
        });

        *self.state.lock().unwrap() = PipelineState::Running;
        tracing::info!(workers = config.worker_count, "pipeline started");
        Ok(())
    }

    /// Cooperative shutdown: signals every thread to stop, waits up to a
    /// grace period for the worker pool to drain, then joins the rest.
    pub fn stop(&self) -> Result<(), PipelineError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state == PipelineState::Idle {
                return Err(PipelineError::PipelineNotRunning);
            }
            *state = PipelineState::Stopping;
        }

        let run = self.run.lock().unwrap().take();
        if let Some(run) = run {
            run.stop_flag.store(true, Ordering::Relaxed);
            run.queue.wake_all();

            let _ = run.capture_handle.join();
            join_with_grace(run.worker_handles, GRACE_PERIOD);
            let _ = run.delivery_handle.join();
        }

        *self.state.lock().unwrap() = PipelineState::Idle;
        tracing::info!("pipeline stopped");
        Ok(())
    }
}

fn join_with_grace(handles: Vec<JoinHandle<()>>, grace: Duration) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for handle in handles {
            let _ = handle.join();
        }
        let _ = tx.send(());
    });
    if rx.recv_timeout(grace).is_err() {
        tracing::warn!("worker threads did not stop within the grace period");
    }
}

fn capture_loop(mut capture: CaptureSource, queue: Arc<FrameQueue>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match capture.poll() {
            Some(frame) => {
                if queue.push(frame).is_some() {
                    tracing::debug!("dropped oldest queued frame under backpressure");
                }
            }
            None => thread::sleep(Duration::from_millis(4)),
        }
    }
    capture.stop();
}

fn worker_loop(
    gpu: Arc<GpuContext>,
    pool: Arc<BufferPool>,
    queue: Arc<FrameQueue>,
    stop: Arc<AtomicBool>,
    results_tx: Sender<WorkItem>,
    state: Arc<Mutex<PipelineState>>,
    config: PipelineConfig,
) {
    let mut algorithm = config.algorithm;
    let mut upscaler: Box<dyn Upscaler> =
        upscaler::build(algorithm, config.quality, config.adaptive_quality);
    upscaler.set_memory_strategy(config.memory_strategy);
    let mut current_dims: Option<(u32, u32)> = None;

    let declare_fatal = |e: PipelineError, results_tx: &Sender<WorkItem>, stop: &Arc<AtomicBool>, state: &Arc<Mutex<PipelineState>>| {
        tracing::error!(error = %e, "fatal GPU error; pipeline stopping");
        *state.lock().unwrap() = PipelineState::Stopping;
        stop.store(true, Ordering::Relaxed);
        let _ = results_tx.send(WorkItem::Fatal(e));
    };

    while !stop.load(Ordering::Relaxed) {
        let Some(frame) = queue.pop_blocking(&stop) else {
            break;
        };

        if current_dims != Some((frame.width, frame.height)) {
            let upconfig = crate::config::UpscalerConfig {
                input_width: frame.width,
                input_height: frame.height,
                output_width: crate::config::scaled_dimension(frame.width, config.scale),
                output_height: crate::config::scaled_dimension(frame.height, config.scale),
                quality: upscaler.current_quality(),
                memory_strategy: config.memory_strategy,
                adaptive_quality: config.adaptive_quality,
            };
            match upscaler.initialize(&gpu, &upconfig) {
                Ok(()) => current_dims = Some((frame.width, frame.height)),
                Err(PipelineError::VendorUnavailable) => {
                    tracing::warn!("vendor neural upscaler unavailable, falling back");
                    algorithm = upscaler::select_best(&upconfig, false);
                    upscaler = upscaler::build(algorithm, upconfig.quality, config.adaptive_quality);
                    upscaler.set_memory_strategy(config.memory_strategy);
                    match upscaler.initialize(&gpu, &upconfig) {
                        Ok(()) => current_dims = Some((frame.width, frame.height)),
                        Err(e) => {
                            declare_fatal(e, &results_tx, &stop, &state);
                            break;
                        }
                    }
                }
                Err(e @ (PipelineError::GpuTimeout | PipelineError::DeviceLost)) => {
                    declare_fatal(e, &results_tx, &stop, &state);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "upscaler initialize failed, dropping frame");
                    let _ = results_tx.send(WorkItem::Dropped(frame.sequence));
                    continue;
                }
            }
        }

        let gpu_start = Instant::now();
        let mut result = upscaler.upscale(&gpu, &pool, &frame.bytes, frame.width, frame.height, frame.sequence);
        if let Err(PipelineError::OutOfVram { .. }) = result {
            tracing::warn!("out of VRAM, shrinking buffer pool and retrying once");
            pool.cleanup(CleanupPolicy::Shrink);
            result = upscaler.upscale(&gpu, &pool, &frame.bytes, frame.width, frame.height, frame.sequence);
        }

        match result {
            Ok(upscaled) => {
                let elapsed = frame.captured_at.elapsed();
                upscaler.record_frame_time(elapsed, config.target_fps);
                let _ = results_tx.send(WorkItem::Completed {
                    sequence: frame.sequence,
                    frame: upscaled,
                    end_to_end_ms: elapsed.as_secs_f32() * 1000.0,
                    gpu_ms: gpu_start.elapsed().as_secs_f32() * 1000.0,
                    quality_tier: upscaler.current_quality(),
                });
            }
            Err(e @ (PipelineError::GpuTimeout | PipelineError::DeviceLost)) => {
                declare_fatal(e, &results_tx, &stop, &state);
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "upscale failed, dropping frame");
                let _ = results_tx.send(WorkItem::Dropped(frame.sequence));
            }
        }
    }
}

struct PendingFrame {
    frame: UpscaledFrame,
    end_to_end_ms: f32,
    gpu_ms: f32,
    quality_tier: crate::config::Quality,
}

fn delivery_loop(
    rx: Receiver<WorkItem>,
    sink: Arc<Mutex<Option<Arc<Sink>>>>,
    telemetry: Arc<Telemetry>,
    gpu: Arc<GpuContext>,
    pool: Arc<BufferPool>,
    queue: Arc<FrameQueue>,
    enable_interpolation: bool,
) {
    let mut next_expected = 0u64;
    let mut pending: BTreeMap<u64, PendingFrame> = BTreeMap::new();
    let mut dropped_sequences: BTreeSet<u64> = BTreeSet::new();
    let mut prev: Option<UpscaledFrame> = None;
    let mut interpolator = FrameInterpolator::new();

    let mut worker_dropped_count = 0u64;
    let mut completed_count = 0u64;
    let mut emitted_count = 0u64;
    let mut last_frame_ms = 0.0f32;
    let mut last_gpu_ms: Option<f32> = None;
    let mut ewma_ms: Option<f32> = None;
    let mut quality_tier = crate::config::Quality::Balanced;
    let mut interpolation_dimension_mismatch_count = 0u64;
    let mut upscaler_name = String::new();
    let started = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(WorkItem::Completed { sequence, frame, end_to_end_ms, gpu_ms, quality_tier }) => {
                if sequence >= next_expected {
                    upscaler_name = frame.upscaler_name.to_string();
                    pending.insert(sequence, PendingFrame { frame, end_to_end_ms, gpu_ms, quality_tier });
                }
            }
            Ok(WorkItem::Dropped(sequence)) => {
                worker_dropped_count += 1;
                if sequence >= next_expected {
                    dropped_sequences.insert(sequence);
                }
            }
            Ok(WorkItem::Fatal(e)) => {
                tracing::error!(error = %e, "delivery stage observed a fatal pipeline error");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        while let Some(resolved) = pending.remove(&next_expected) {
            completed_count += 1;
            last_frame_ms = resolved.end_to_end_ms;
            last_gpu_ms = Some(resolved.gpu_ms);
            ewma_ms = Some(match ewma_ms {
                Some(prev_ewma) => prev_ewma * 0.8 + resolved.end_to_end_ms * 0.2,
                None => resolved.end_to_end_ms,
            });

            if enable_interpolation {
                if let Some(prev_frame) = &prev {
                    match interpolator.interpolate(
                        &gpu,
                        &pool,
                        &prev_frame.bytes,
                        prev_frame.width,
                        prev_frame.height,
                        &resolved.frame.bytes,
                        resolved.frame.width,
                        resolved.frame.height,
                        prev_frame.source_sequence,
                        0.5,
                    ) {
                        Ok(mid) => {
                            emit(&sink, OutputFrame {
                                bytes: mid.bytes,
                                width: mid.width,
                                height: mid.height,
                                source_sequence: mid.source_sequence,
                                kind: OutputKind::Interpolated,
                                timings: Timings { end_to_end_ms: resolved.end_to_end_ms, gpu_ms: mid.gpu_ms },
                            });
                            emitted_count += 1;
                        }
                        Err(e @ PipelineError::DimensionMismatch { .. }) => {
                            interpolation_dimension_mismatch_count += 1;
                            tracing::debug!(error = %e, "skipping interpolation for this pair");
                        }
                        Err(e) => tracing::debug!(error = %e, "skipping interpolation for this pair"),
                    }
                }
            }

            emit(&sink, OutputFrame {
                bytes: resolved.frame.bytes.clone(),
                width: resolved.frame.width,
                height: resolved.frame.height,
                source_sequence: resolved.frame.source_sequence,
                kind: OutputKind::Upscaled,
                timings: Timings { end_to_end_ms: resolved.end_to_end_ms, gpu_ms: Some(resolved.gpu_ms) },
            });
            emitted_count += 1;
            quality_tier = resolved.quality_tier;
            prev = Some(resolved.frame);
            next_expected += 1;
            continue;
        }
        while dropped_sequences.remove(&next_expected) {
            next_expected += 1;
        }

        let elapsed_total = started.elapsed().as_secs_f32().max(0.001);
        telemetry.publish(TelemetrySnapshot {
            base_fps: completed_count as f32 / elapsed_total,
            scaled_fps: emitted_count as f32 / elapsed_total,
            last_frame_ms,
            last_gpu_ms,
            ewma_frame_ms: ewma_ms.unwrap_or(0.0),
            dropped_frames_count: queue.dropped_total() + worker_dropped_count,
            interpolation_dimension_mismatch_count,
            upscaler_name: upscaler_name.clone(),
            current_quality_tier: quality_tier,
            vram_stats: gpu.vram_stats(),
        });
    }
}

fn emit(sink: &Arc<Mutex<Option<Arc<Sink>>>>, frame: OutputFrame) {
    if let Some(callback) = sink.lock().unwrap().as_ref() {
        callback(frame);
    }
}

#[cfg(test)]
mod tests;
