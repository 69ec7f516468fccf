//! Command-line driver for grid-world scenarios

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use gridmind::prelude::*;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "gridmind", version, about = "Run grid-world AI scenarios headlessly")]
struct Cli {
    /// Scenario file (.ron or .json); the built-in arena when omitted
    #[arg(short, long, global = true)]
    scenario: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a scenario and print a summary
    Run {
        /// Decision engine: astar, bt or fsm
        #[arg(short, long, default_value = "astar")]
        mode: AiMode,
        /// Ticks to simulate; the scenario's count when omitted
        #[arg(short, long)]
        ticks: Option<u32>,
        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the walkability grid
    Grid,
    /// Plan a path between two world points
    Path {
        /// Start x
        from_x: f32,
        /// Start y
        from_y: f32,
        /// Goal x
        to_x: f32,
        /// Goal y
        to_y: f32,
    },
    /// Write the built-in arena to a file
    Init {
        /// Output path (.ron or .json)
        out: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> CliResult {
    let config = load_scenario(cli.scenario.as_deref())?;

    match cli.command {
        Command::Run { mode, ticks, seed } => run(config, mode, ticks, seed),
        Command::Grid => {
            let grid = build_grid(&config)?;
            print!("{grid}");
            Ok(())
        }
        Command::Path {
            from_x,
            from_y,
            to_x,
            to_y,
        } => plan(&config, Vec2::new(from_x, from_y), Vec2::new(to_x, to_y)),
        Command::Init { out } => init(&config, &out),
    }
}

fn load_scenario(path: Option<&Path>) -> Result<ScenarioConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            log::info!("Loading scenario from {}", path.display());
            Ok(ScenarioConfig::load(path)?)
        }
        None => Ok(ScenarioConfig::default()),
    }
}

fn build_grid(config: &ScenarioConfig) -> Result<GridMap, Box<dyn std::error::Error>> {
    config.validate()?;
    Ok(GridMap::new(
        config.world_width,
        config.world_height,
        config.cell_size,
        &config.obstacles,
    ))
}

fn run(mut config: ScenarioConfig, mode: AiMode, ticks: Option<u32>, seed: Option<u64>) -> CliResult {
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let ticks = ticks.unwrap_or(config.ticks);

    let mut sim = Simulation::new(config, mode)?;
    sim.run(ticks);

    let stats = sim.stats();
    println!(
        "{} | {} mode | {:.1}s simulated",
        sim.config().name,
        sim.mode(),
        sim.elapsed()
    );
    println!("{}", stats.format_stats());
    for (label, seconds) in stats.state_breakdown() {
        println!("  {label:<8} {seconds:>8.2}s");
    }
    if let Some(closest) = stats.closest_approach() {
        println!("Closest approach to target: {closest:.1}");
    }
    for (i, agent) in sim.agents().iter().enumerate() {
        let body = agent.body();
        println!(
            "Agent {i}: {} at ({:.1}, {:.1})",
            agent.state_label(),
            body.position.x,
            body.position.y
        );
    }
    Ok(())
}

fn plan(config: &ScenarioConfig, start: Vec2, goal: Vec2) -> CliResult {
    let grid = build_grid(config)?;
    let path = find_path(&grid, start, goal);

    if path.is_empty() {
        println!("No path from {start} to {goal}");
        return Ok(());
    }

    println!("{} waypoints, length {:.1}", path.len(), path.length);
    for point in &path.waypoints {
        println!("  ({:.1}, {:.1})", point.x, point.y);
    }
    Ok(())
}

fn init(config: &ScenarioConfig, out: &Path) -> CliResult {
    let is_json = out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        config.save_json(out)?;
    } else {
        config.save_ron(out)?;
    }
    log::info!("Wrote scenario '{}' to {}", config.name, out.display());
    Ok(())
}
