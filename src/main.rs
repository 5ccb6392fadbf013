//! Soundwalk CLI
//!
//! Composition validation and offline simulation of a recorded position
//! track against the transition engine.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use soundwalk::audio::LogBackend;
use soundwalk::engine::TransitionEngine;
use soundwalk::model::{Composition, Position};

#[derive(Parser)]
#[command(name = "soundwalk-cli", version, about = "Spatial audio transition engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a composition and report which boundaries are usable
    Validate {
        /// Composition JSON file
        composition: PathBuf,
    },
    /// Replay a recorded position track through the engine, printing the
    /// status snapshot after each event
    Simulate {
        /// Composition JSON file
        composition: PathBuf,
        /// JSON array of position events
        track: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Validate { composition } => validate(&composition),
        Commands::Simulate { composition, track } => simulate(&composition, &track),
    }
}

fn validate(path: &PathBuf) -> anyhow::Result<()> {
    let loaded = Composition::load_file(path)
        .with_context(|| format!("loading composition {}", path.display()))?;

    println!("{} boundaries loaded", loaded.boundaries.len());
    for boundary in &loaded.boundaries {
        println!(
            "  ok   {} ({} vertices, radius {} m)",
            boundary.id,
            boundary.vertices.len(),
            boundary.settings.transition_radius
        );
    }
    for (id, err) in &loaded.rejected {
        println!("  SKIP {id}: {err}");
    }
    Ok(())
}

fn simulate(composition: &PathBuf, track: &PathBuf) -> anyhow::Result<()> {
    let loaded = Composition::load_file(composition)
        .with_context(|| format!("loading composition {}", composition.display()))?;
    let positions: Vec<Position> = serde_json::from_str(
        &std::fs::read_to_string(track)
            .with_context(|| format!("reading track {}", track.display()))?,
    )
    .context("parsing position track")?;

    let mut engine = TransitionEngine::from_composition(loaded, LogBackend);
    for position in &positions {
        match engine.process_position(position) {
            Ok(status) => println!("{}", serde_json::to_string(&status)?),
            Err(err) => eprintln!("dropped position: {err}"),
        }
    }
    Ok(())
}
