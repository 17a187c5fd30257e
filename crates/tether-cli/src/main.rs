//! Tether CLI - run the binding demo on the headless toolkit
//!
//! # Usage
//!
//! ```bash
//! # Run the demo for the default number of frames
//! tether
//!
//! # Load viewport settings from a file and run 120 frames
//! tether --config host.toml --frames 120 --log-level debug
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tether_gui::HostConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod demo;

/// Frames to run when neither the config nor the command line sets a limit
const DEFAULT_FRAMES: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(version = tether_gui::VERSION)]
#[command(about = "Run the tether binding demo on a headless toolkit", long_about = None)]
struct Args {
    /// Host configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to run, overriding the configuration
    #[arg(short, long)]
    frames: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = match &args.config {
        Some(path) => {
            HostConfig::load(path).with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => HostConfig::default(),
    };

    if let Some(frames) = args.frames {
        config.max_frames = Some(frames);
    }
    if config.max_frames.is_none() {
        tracing::info!(frames = DEFAULT_FRAMES, "no frame limit configured, using default");
        config.max_frames = Some(DEFAULT_FRAMES);
    }

    let summary = demo::run(config).context("demo failed")?;

    println!("Ran {} frames, button clicked {} time(s)", summary.frames, summary.clicks);
    for (name, value) in &summary.settings {
        println!("  {name} = {value}");
    }

    Ok(())
}
