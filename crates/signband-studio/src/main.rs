use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use signband_engine::device::GpuInit;
use signband_engine::logging::{init_logging, LoggingConfig};
use signband_engine::window::{Runtime, RuntimeConfig};
use signband_model::SceneConfig;
use winit::dpi::LogicalSize;

mod app;
mod detail;
mod loader;

use app::StudioApp;

#[derive(Parser, Debug)]
#[command(about = "Orbiting band of image signs with hover details", version)]
struct Cli {
    /// JSON array of image records (`_id`, `filename`, `colors`, `labels`, ...)
    records: PathBuf,

    /// Scene config JSON; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Placement seed. A random seed is chosen and logged when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Band rotation per frame in radians, overriding the config
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<f32>,

    /// Records delivered to the scene per loader batch
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// env_logger filter, e.g. "signband_engine=debug"
    #[arg(long)]
    log: Option<String>,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 720.0)]
    height: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    ensure!(cli.batch_size > 0, "--batch-size must be at least 1");
    ensure!(
        cli.width > 0.0 && cli.height > 0.0,
        "window size must be positive (got {}x{})",
        cli.width,
        cli.height
    );

    let config = load_config(cli.config.as_deref(), cli.speed)?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("placement seed {seed}");

    let batches = loader::spawn(cli.records.clone(), cli.batch_size)?;
    let app = StudioApp::new(config, seed, batches);

    let runtime = RuntimeConfig {
        title: "signband".to_string(),
        initial_size: LogicalSize::new(cli.width, cli.height),
    };
    Runtime::run(runtime, GpuInit::default(), app)
}

fn load_config(path: Option<&Path>, speed: Option<f32>) -> Result<SceneConfig> {
    let mut config = match path {
        Some(path) => {
            let src = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SceneConfig::from_json_str(&src)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SceneConfig::default(),
    };

    if let Some(speed) = speed {
        config.animation.speed = speed;
        config.validate().context("--speed")?;
    }
    Ok(config)
}
