use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hamlet::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Hamlet village and wolf simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/meadow.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the time step in seconds
    #[arg(long)]
    dt: Option<f32>,

    /// Override seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let mut scenario = loader.load(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(dt) = cli.dt {
        scenario.dt_secs = dt;
        scenario.validate()?;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&scenario.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut world = scenario.build_world();
    let ticks = scenario.ticks(cli.ticks);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        dt_secs: scenario.dt_secs,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_default_systems()
        .with_observer(|event: &hamlet::SimEvent| tracing::trace!(?event, "lifecycle"))
        .build();

    engine.run(&mut world, ticks)?;
    let stock = world.settlement().map(|s| s.stock()).unwrap_or(0);
    let houses = world.settlement().map_or(0, |s| s.houses().len());
    info!(
        scenario = %scenario.name,
        ticks,
        population = world.population(),
        wolves = world.wolf_count(),
        stock,
        houses,
        "run complete"
    );
    println!(
        "Scenario '{}' completed for {} ticks. Villagers: {}, wolves: {}, houses: {}, stock: {}",
        scenario.name,
        ticks,
        world.population(),
        world.wolf_count(),
        houses,
        stock
    );
    Ok(())
}
