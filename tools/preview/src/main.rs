//! Diagnostic preview: renders the shaded terrain top-down on the CPU and
//! dumps the contour strip, optionally after a headless animation run.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use isoline_core::shading;
use isoline_core::{
    AnimationDriver, ManualClock, RecordingBackend, Renderer, SceneConfig, Sizes, StopSignal, TerrainMesh,
    TerrainScene,
};
use log::info;
use rayon::prelude::*;

/// Width of the widened contour strip, matching the on-screen debug preview.
const STRIP_WIDTH: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "preview", about = "Render terrain and contour previews to PNG")]
struct Args {
    /// Scene config JSON. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "data/preview")]
    out_dir: PathBuf,

    /// Output image side in pixels.
    #[arg(long, default_value_t = 512)]
    size: u32,

    /// Half-width of the rendered square in world units.
    #[arg(long, default_value_t = 5.0)]
    extent: f32,

    /// Animation time in seconds. Ignored when `--ticks` is given.
    #[arg(short, long, default_value_t = 0.0)]
    time: f64,

    /// Run this many animation ticks headlessly before rendering.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Write the contour strip even when the config hides it.
    #[arg(long)]
    contour: bool,
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Top-down orthographic view, world x to the right and z downwards.
fn render_top_down(scene: &TerrainScene, size: u32, extent: f32) -> Result<image::RgbImage> {
    let p = scene.params();
    let clear = scene.clear_color();
    let displacement = scene.displacement();
    let texture = scene.contour().texture();
    let n = size as usize;
    let to_world = |i: usize| -extent + (i as f32 + 0.5) / n as f32 * 2.0 * extent;

    let mut buf = vec![0u8; n * n * 3];
    buf.par_chunks_mut(n * 3).enumerate().for_each(|(row, line)| {
        let z = to_world(row);
        for (col, px) in line.chunks_exact_mut(3).enumerate() {
            let x = to_world(col);
            let e = displacement.elevation(x, z, &p);
            let rgb = shading::shade(e, &p, texture).over(clear).to_u8();
            px.copy_from_slice(&rgb);
        }
    });
    image::RgbImage::from_raw(size, size, buf).context("terrain buffer size mismatch")
}

fn elevation_range(scene: &TerrainScene) -> (f32, f32) {
    let mesh = TerrainMesh::plane(1.0, 250, 10.0);
    mesh.displaced_positions(scene.displacement(), &scene.params())
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v[1]), hi.max(v[1])))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(p) => SceneConfig::from_json_file(p).with_context(|| format!("reading config {}", p.display()))?,
        None => SceneConfig::default(),
    };
    let (scene, _panel, mut time) =
        TerrainScene::with_mesh(&config, TerrainMesh::plane(1.0, 64, 10.0)).context("building scene")?;

    let mut scene = if args.ticks > 0 {
        let renderer = Renderer::new(RecordingBackend::default(), Sizes::default(), scene.clear_color());
        let mut driver = AnimationDriver::new(scene, time, renderer, ManualClock::default());
        let stop = StopSignal::new();
        let step = 1.0 / args.fps.max(1.0);
        let ticks = args.ticks;
        driver.run(&stop, |d| {
            d.clock_mut().advance(step);
            if d.frames() >= ticks {
                stop.raise();
            }
        });
        let backend = driver.renderer().backend();
        println!(
            "Ran {} ticks: {} draws, {} contour uploads, t = {:.3}s",
            driver.frames(),
            backend.draws.len(),
            backend.uploads.len(),
            driver.scene().params().time
        );
        driver.into_scene()
    } else {
        time.set(args.time);
        scene
    };
    scene.sync();

    fs::create_dir_all(&args.out_dir).with_context(|| format!("creating {}", args.out_dir.display()))?;

    let (lo, hi) = elevation_range(&scene);
    info!("elevation range [{lo:.4}, {hi:.4}]");

    let img = render_top_down(&scene, args.size, args.extent)?;
    let path = args.out_dir.join("terrain.png");
    img.save(&path).with_context(|| format!("saving {}", path.display()))?;
    println!("Wrote {}", path.display());

    if args.contour || scene.preview_visible() {
        let texture = scene.contour().texture();
        let rgba = texture.preview_rgba(STRIP_WIDTH);
        let strip = image::RgbaImage::from_raw((texture.width * STRIP_WIDTH) as u32, texture.height as u32, rgba)
            .context("contour strip size mismatch")?;
        let path = args.out_dir.join("contour.png");
        strip.save(&path).with_context(|| format!("saving {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("Done.");
    Ok(())
}
