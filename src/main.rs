use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nightfall::{
    config::Tuning,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{CitySystem, UnitSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Plans one turn for a YAML game snapshot")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/four_by_four.yaml")]
    scenario: PathBuf,

    /// Tuning YAML; stock constants when omitted
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for turn diagnostics
    #[arg(long, default_value = "diagnostics")]
    diagnostics_dir: PathBuf,

    /// Write diagnostics every N turns (0 disables)
    #[arg(long, default_value_t = 0)]
    diagnostics_interval: u32,

    /// Print the full report as JSON instead of action tokens
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let (scenario, snapshot) = loader.load_snapshot(&cli.scenario)?;
    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    let settings = EngineSettings {
        label: scenario.name.clone(),
        seed: cli.seed.unwrap_or(scenario.seed),
        diagnostics_interval: cli.diagnostics_interval,
        diagnostics_dir: cli.diagnostics_dir,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_tuning(tuning)
        .with_system(CitySystem::new())
        .with_system(UnitSystem::new())
        .build()?;

    let report = engine.run_turn(&snapshot)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for token in report.tokens() {
            println!("{token}");
        }
        println!(
            "Scenario '{}' turn {}: {} actions, {} fuel orders ({:?}), {} cluster orders ({:?})",
            scenario.name,
            report.turn,
            report.actions.len(),
            report.orders.fuel.orders.len(),
            report.orders.fuel.status,
            report.orders.clusters.orders.len(),
            report.orders.clusters.status,
        );
    }
    Ok(())
}
