//! CLI tool to run a saved screenshot through phase classification and scene analysis.
//! Usage: cargo run -p arena-vision --features cli --bin analyze_frame -- <screenshot.png> [templates_dir]

use arena_vision::{TemplateKind, VisionConfig, VisionSystem};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arena_vision=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <screenshot.png> [templates_dir]", args[0]);
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let templates_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("templates"));

    println!("Loading image: {}", input_path.display());
    let frame = image::open(&input_path)?;
    println!("Image size: {}x{}", frame.width(), frame.height());

    let mut vision = VisionSystem::load(&templates_dir, VisionConfig::default());
    println!(
        "Templates: {} cards, {} UI elements, {} enemy units",
        vision.templates().len(TemplateKind::Card),
        vision.templates().len(TemplateKind::UiElement),
        vision.templates().len(TemplateKind::EnemyUnit),
    );
    let thresholds = vision.config().thresholds;
    println!(
        "Thresholds: ui {} / card {} / enemy {} / locate {}",
        thresholds.ui, thresholds.card, thresholds.enemy_unit, thresholds.locate
    );

    println!("\n=== Phase ===");
    let phase = vision.classify(&frame)?;
    println!("{}", phase);

    println!("\n=== Scene ===");
    let scene = vision.analyze_classified(&frame)?;
    println!("{}", serde_json::to_string_pretty(&scene)?);

    Ok(())
}
