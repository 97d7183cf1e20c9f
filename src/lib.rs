pub mod config;
pub mod executor;
pub mod pipeline;

use anyhow::{Context, Result};
use arena_advisor::StrategyEngine;
use arena_capture::{AdbDevice, DryRunInput, FrameSource, InputDevice, ReplaySource};
use arena_data::GameData;
use arena_vision::VisionSystem;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use config::BotConfig;
use executor::ActionExecutor;
use pipeline::BotLoop;

/// Template-matching bot for a portrait mobile card-battle game.
#[derive(Debug, Parser)]
#[command(name = "arena-bot", version)]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Template root with cards/, ui_elements/ and enemy_units/
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Directory holding cards.json
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// adb serial of the target device
    #[arg(long)]
    pub device: Option<String>,

    /// Path to the adb executable
    #[arg(long)]
    pub adb: Option<PathBuf>,

    /// Replay screenshots from a directory instead of a device (input is not sent)
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Save annotated ROI snapshots for every analyzed frame
    #[arg(long)]
    pub debug: bool,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "arena_bot=info,arena_vision=info,arena_capture=info,arena_advisor=info,arena_data=info"
                    .into()
            }),
        )
        .init();

    let args = Args::parse();
    let config = BotConfig::from_args(&args)?;
    info!("Templates directory: {}", config.templates_dir.display());
    info!("Data directory: {}", config.data_dir.display());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run_bot(config, args.ticks))
}

async fn run_bot(config: BotConfig, max_ticks: Option<u64>) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));

    let stop_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop_signal.store(true, Ordering::Relaxed);
        }
    });

    let worker = tokio::task::spawn_blocking(move || -> Result<u64> {
        let game_data = GameData::load(&config.data_dir).unwrap_or_else(|e| {
            warn!("Failed to load card data: {:#}. Using built-in table", e);
            GameData::builtin()
        });
        let vision = VisionSystem::load(&config.templates_dir, config.vision.clone());
        let strategy = StrategyEngine::new(game_data);

        match &config.replay_dir {
            Some(dir) => {
                let source = ReplaySource::open(dir)?;
                Ok(drive(source, DryRunInput::new(), vision, strategy, &config, &stop, max_ticks))
            }
            None => {
                let adb = AdbDevice::new(config.adb_path.clone(), config.device_id.clone())
                    .with_timeout(config.adb_timeout());
                adb.check_connection();
                Ok(drive(adb.clone(), adb, vision, strategy, &config, &stop, max_ticks))
            }
        }
    });

    let ticks = worker.await.context("Bot worker panicked")??;
    info!("Finished after {} ticks", ticks);
    Ok(())
}

fn drive<S: FrameSource, D: InputDevice>(
    source: S,
    input: D,
    vision: VisionSystem,
    strategy: StrategyEngine,
    config: &BotConfig,
    stop: &AtomicBool,
    max_ticks: Option<u64>,
) -> u64 {
    let executor = ActionExecutor::new(input, config.swipe_duration());
    BotLoop::new(source, vision, strategy, executor)
        .with_auto_navigate(config.auto_navigate)
        .with_tick_interval(config.tick_interval())
        .run(stop, max_ticks)
}
