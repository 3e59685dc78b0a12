//! Offline regression harness: writes and checks displaced-vertex snapshots.
//!
//! Displacement is a pure function of position, seed and parameters, so a
//! snapshot written once must be reproduced by every later build.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use isoline_core::{Displacement, SceneConfig, TerrainMesh, VertexSnapshot};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "isoline-test", about = "Vertex snapshot regression harness")]
struct Args {
    /// Scene config JSON. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sample every N-th vertex along both grid axes.
    #[arg(short, long, default_value_t = 50, global = true)]
    stride: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a snapshot and write it as JSON.
    Write {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Recompute and compare against a stored snapshot.
    Check {
        #[arg(short, long)]
        input: PathBuf,

        /// Largest accepted per-component difference.
        #[arg(short, long, default_value_t = 0.0)]
        tolerance: f32,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SceneConfig> {
    match path {
        Some(p) => SceneConfig::from_json_file(p).with_context(|| format!("reading config {}", p.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn compute(config: &SceneConfig, stride: usize) -> Result<VertexSnapshot> {
    let config = config.clone().sanitized().context("sanitizing config")?;
    let mesh = TerrainMesh::default();
    let displacement = Displacement::new(config.seed);
    Ok(mesh.snapshot(&displacement, &config.terrain, stride))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Write { output } => {
            let snap = compute(&config, args.stride)?;
            let json = serde_json::to_string_pretty(&snap).context("serializing snapshot")?;
            fs::write(&output, json).with_context(|| format!("writing {}", output.display()))?;
            info!("wrote {} vertices to {}", snap.positions.len(), output.display());
        }
        Command::Check { input, tolerance } => {
            let text = fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
            let stored: VertexSnapshot =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", input.display()))?;
            // Rebuild from the snapshot's own seed, params and stride so the check
            // does not depend on the config the caller passes today.
            let config = SceneConfig { seed: stored.seed, terrain: stored.params, ..config };
            let fresh = compute(&config, stored.stride)?;
            let Some(dev) = stored.max_deviation(&fresh) else {
                bail!(
                    "layout mismatch: stored {} vertices (segments {}, stride {}), computed {}",
                    stored.positions.len(),
                    stored.segments,
                    stored.stride,
                    fresh.positions.len()
                );
            };
            if dev > tolerance {
                bail!("max deviation {dev} exceeds tolerance {tolerance}");
            }
            println!("OK: {} vertices, max deviation {dev}", fresh.positions.len());
        }
    }

    Ok(())
}
