use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tilefield_core::{FieldConfig, Tile, TileWorld, WorldFile};
use tracing::info;

#[derive(Parser)]
#[command(name = "tilefield", version, about = "Compute tile influence fields over a grid world")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one field pass and emit the pass summary as JSON.
    Run {
        #[arg(long)]
        world: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the summary here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Query tiles on the rayon pool.
        #[arg(long)]
        parallel: bool,
    },
    /// Run a pass, then list the candidate tiles the index returns for a point.
    Query {
        #[arg(long)]
        world: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Run {
            world,
            config,
            output,
            parallel,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.parallel |= parallel;
            let mut world = load_world(&world, config)?;
            let timings = world.calculate_field();
            info!(
                tiles = world.tile_count(),
                max_magnitude = world.largest_field_strength(),
                total_us = timings.total_us,
                "field pass finished"
            );
            let json = serde_json::to_string_pretty(&world.summary())?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("writing summary to {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Query { world, config, x, y } => {
            let config = load_config(config.as_deref())?;
            let mut world = load_world(&world, config)?;
            world.calculate_field();
            let candidates: Vec<&Tile> = world.candidates_at([x, y]);
            info!(x, y, candidates = candidates.len(), "index lookup");
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<FieldConfig> {
    match path {
        Some(path) => read_json(path),
        None => Ok(FieldConfig::default()),
    }
}

fn load_world(path: &Path, config: FieldConfig) -> Result<TileWorld> {
    let file: WorldFile = read_json(path)?;
    TileWorld::from_file(file, config)
        .with_context(|| format!("building world from {}", path.display()))
}
