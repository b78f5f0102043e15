//! Command-line harness for exercising the pipeline end to end against the
//! synthetic capture backend. Not part of the library's public surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use upscale_engine::{
    BufferPool, CaptureTarget, GpuContext, MemoryStrategy, OutputKind, PipelineConfig,
    PipelineCoordinator, ScaleAlgorithm, Quality,
};

#[derive(Parser, Debug)]
#[command(name = "upscale-engine-demo", about = "Runs the upscaling pipeline against a synthetic capture source")]
struct Args {
    #[arg(long, value_enum, default_value = "bilinear")]
    algorithm: AlgorithmArg,

    #[arg(long, value_enum, default_value = "balanced")]
    quality: QualityArg,

    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    #[arg(long, default_value_t = 2)]
    workers: usize,

    #[arg(long, default_value_t = false)]
    interpolate: bool,

    #[arg(long, default_value_t = false)]
    adaptive_quality: bool,

    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum AlgorithmArg {
    Nearest,
    Bilinear,
    Lanczos,
    VendorNeural,
}

impl From<AlgorithmArg> for ScaleAlgorithm {
    fn from(value: AlgorithmArg) -> ScaleAlgorithm {
        match value {
            AlgorithmArg::Nearest => ScaleAlgorithm::Nearest,
            AlgorithmArg::Bilinear => ScaleAlgorithm::Bilinear,
            AlgorithmArg::Lanczos => ScaleAlgorithm::Lanczos,
            AlgorithmArg::VendorNeural => ScaleAlgorithm::VendorNeural,
        }
    }
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum QualityArg {
    Performance,
    Balanced,
    Quality,
    Ultra,
}

impl From<QualityArg> for Quality {
    fn from(value: QualityArg) -> Quality {
        match value {
            QualityArg::Performance => Quality::Performance,
            QualityArg::Balanced => Quality::Balanced,
            QualityArg::Quality => Quality::Quality,
            QualityArg::Ultra => Quality::Ultra,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let gpu = Arc::new(GpuContext::probe()?);
    tracing::info!(adapter = ?gpu.adapter_info(), "opened GPU device");

    let pool = Arc::new(BufferPool::new(gpu.clone(), MemoryStrategy::Auto));
    let coordinator = PipelineCoordinator::new(gpu, pool);

    let config = PipelineConfig::builder()
        .target(CaptureTarget::FullScreen)
        .algorithm(args.algorithm.into())
        .quality(args.quality.into())
        .scale(args.scale)
        .worker_count(args.workers)
        .memory_strategy(MemoryStrategy::Auto)
        .adaptive_quality(args.adaptive_quality)
        .enable_interpolation(args.interpolate)
        .target_fps(60)
        .build();

    coordinator.configure(config)?;

    let upscaled_count = Arc::new(AtomicU64::new(0));
    let interpolated_count = Arc::new(AtomicU64::new(0));
    let upscaled_count_sink = upscaled_count.clone();
    let interpolated_count_sink = interpolated_count.clone();
    coordinator.subscribe(move |frame| match frame.kind {
        OutputKind::Upscaled => {
            upscaled_count_sink.fetch_add(1, Ordering::Relaxed);
        }
        OutputKind::Interpolated => {
            interpolated_count_sink.fetch_add(1, Ordering::Relaxed);
        }
    });

    coordinator.start()?;
    tracing::info!(seconds = args.seconds, "pipeline running");

    for _ in 0..args.seconds {
        std::thread::sleep(Duration::from_secs(1));
        let stats = coordinator.stats();
        tracing::info!(
            scaled_fps = stats.scaled_fps,
            ewma_frame_ms = stats.ewma_frame_ms,
            dropped = stats.dropped_frames_count,
            quality = ?stats.current_quality_tier,
            upscaler = %stats.upscaler_name,
            "tick"
        );
    }

    coordinator.stop()?;
    tracing::info!(
        upscaled = upscaled_count.load(Ordering::Relaxed),
        interpolated = interpolated_count.load(Ordering::Relaxed),
        "pipeline stopped"
    );

    Ok(())
}
