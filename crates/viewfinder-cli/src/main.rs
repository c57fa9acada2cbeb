use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use viewfinder_core::ProcessingParameters;
use viewfinder_hw::{
    probe_capture_indices, resolve_cameras, CaptureSession, SysfsRegistry, V4lCaptureBackend,
};

mod config;
mod pump;
mod sink;

use config::Config;
use pump::{run_pump, PumpOptions};
use sink::{write_png, FrameSink, NullSink, PngDirSink};

/// Fixed output name for single-shot captures.
const STILL_FILENAME: &str = "captured_image.png";

#[derive(Parser)]
#[command(name = "viewfinder", about = "Webcam discovery and edge-detection preview tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Edge-chain overrides shared by preview and capture. Anything not given
/// falls back to the `VIEWFINDER_*` environment, then to built-in defaults.
#[derive(Args)]
struct ParamArgs {
    /// Lower hysteresis threshold (0-255)
    #[arg(long)]
    low_threshold: Option<u8>,
    /// Upper hysteresis threshold (0-255)
    #[arg(long)]
    high_threshold: Option<u8>,
    /// Gaussian kernel size (odd)
    #[arg(long)]
    blur_kernel: Option<u32>,
    /// Sobel aperture (3, 5 or 7)
    #[arg(long)]
    aperture: Option<u32>,
}

impl ParamArgs {
    fn apply(&self, base: ProcessingParameters) -> ProcessingParameters {
        ProcessingParameters {
            low_threshold: self.low_threshold.unwrap_or(base.low_threshold),
            high_threshold: self.high_threshold.unwrap_or(base.high_threshold),
            blur_kernel_size: self.blur_kernel.unwrap_or(base.blur_kernel_size),
            aperture_size: self.aperture.unwrap_or(base.aperture_size),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List cameras the OS reports, matched to working capture indices
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Probe indices 0..N (default from VIEWFINDER_MAX_PROBE_INDEX)
        #[arg(long)]
        max_index: Option<u32>,
    },
    /// Show raw probe results per capture index (diagnostics)
    Probe {
        #[arg(long)]
        max_index: Option<u32>,
    },
    /// Pull frames through the edge chain at a fixed interval
    Preview {
        /// Capture index to open
        #[arg(short, long)]
        camera: u32,
        /// Stop after this many frames (default: run until the stream dies)
        #[arg(long)]
        frames: Option<u64>,
        /// Milliseconds between pulls
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Write each delivered frame as a PNG into this directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Deliver raw frames, skipping the edge chain
        #[arg(long)]
        raw: bool,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Capture a single still to captured_image.png
    Capture {
        #[arg(short, long, default_value_t = 0)]
        camera: u32,
        /// Run the edge chain before writing
        #[arg(long)]
        processed: bool,
        #[command(flatten)]
        params: ParamArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::List { json, max_index } => cmd_list(&config, json, max_index),
        Commands::Probe { max_index } => cmd_probe(&config, max_index),
        Commands::Preview {
            camera,
            frames,
            interval_ms,
            output,
            raw,
            params,
        } => cmd_preview(&config, camera, frames, interval_ms, output, raw, &params),
        Commands::Capture {
            camera,
            processed,
            params,
        } => cmd_capture(&config, camera, processed, &params),
    }
}

fn cmd_list(config: &Config, json: bool, max_index: Option<u32>) -> Result<()> {
    let registry = SysfsRegistry::new();
    let backend = V4lCaptureBackend::with_timeout(config.read_timeout);
    let cameras = resolve_cameras(
        &registry,
        &backend,
        max_index.unwrap_or(config.max_probe_index),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&cameras)?);
        return Ok(());
    }

    if cameras.is_empty() {
        println!("No cameras found");
    } else {
        for camera in &cameras {
            println!("{} (index: {})", camera.display_name, camera.index);
        }
    }
    Ok(())
}

fn cmd_probe(config: &Config, max_index: Option<u32>) -> Result<()> {
    let backend = V4lCaptureBackend::with_timeout(config.read_timeout);
    let candidates =
        probe_capture_indices(&backend, max_index.unwrap_or(config.max_probe_index));

    println!("index  opened  first frame");
    for candidate in &candidates {
        println!(
            "{:<5}  {:<6}  {}",
            candidate.index,
            if candidate.opened { "yes" } else { "no" },
            if candidate.first_frame_ok { "ok" } else { "-" }
        );
    }
    Ok(())
}

fn cmd_preview(
    config: &Config,
    camera: u32,
    frames: Option<u64>,
    interval_ms: Option<u64>,
    output: Option<PathBuf>,
    raw: bool,
    params: &ParamArgs,
) -> Result<()> {
    let params = params.apply(config.parameters);
    params.validate().context("bad processing parameters")?;

    let backend = V4lCaptureBackend::with_timeout(config.read_timeout);
    let mut session = CaptureSession::new(backend);
    session
        .start(camera)
        .with_context(|| format!("failed to start camera {camera}"))?;

    let mut sink: Box<dyn FrameSink> = match output {
        Some(dir) => Box::new(PngDirSink::new(dir)?),
        None => Box::new(NullSink::default()),
    };

    let options = PumpOptions {
        interval: interval_ms
            .map(Duration::from_millis)
            .unwrap_or(config.interval),
        max_frames: frames,
        process: !raw,
    };

    let stats = run_pump(&mut session, &params, &options, sink.as_mut())?;
    session.stop();

    println!(
        "{} frame(s) in {:.1}s ({:.1} fps)",
        stats.frames,
        stats.elapsed.as_secs_f64(),
        stats.fps()
    );
    if stats.stream_lost {
        println!("camera stopped delivering frames; preview ended early");
    }
    Ok(())
}

fn cmd_capture(config: &Config, camera: u32, processed: bool, params: &ParamArgs) -> Result<()> {
    let params = params.apply(config.parameters);
    params.validate().context("bad processing parameters")?;

    let backend = V4lCaptureBackend::with_timeout(config.read_timeout);
    let mut session = CaptureSession::new(backend);
    session
        .start(camera)
        .with_context(|| format!("failed to start camera {camera}"))?;
    let frame = session
        .next_frame()
        .context("failed to capture a frame")?;
    session.stop();

    let still = if processed {
        viewfinder_core::process_frame(&frame, &params)?
    } else {
        frame
    };
    write_png(&still, STILL_FILENAME.as_ref())?;
    println!("wrote {STILL_FILENAME}");
    Ok(())
}
