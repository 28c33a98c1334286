//! Headless collision scan.
//!
//! Builds a small room, runs the tile renderer into a [`MemorySurface`] until
//! every tile has been uploaded once, and prints an ASCII view of the hit
//! distances. Optional arguments: a `DebuggerConfig` JSON file and a
//! `RenderSettings` JSON file.
//!
//! ```text
//! RUST_LOG=hitscope_engine=debug cargo run --example headless_scan
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hitscope_engine::prelude::*;
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 96;
const HEIGHT: u32 = 48;

fn build_world() -> anyhow::Result<CollisionWorld> {
    let mut world = CollisionWorld::new();
    world.extend([
        SceneCollider::cuboid(1.0, 400.0, 400.0).at(600.0, 0.0, 0.0),
        SceneCollider::cuboid(400.0, 400.0, 1.0).at(0.0, 0.0, -150.0),
        SceneCollider::ball(60.0).at(250.0, -120.0, -40.0),
    ]);
    world.add_collider_with_profile(
        SceneCollider::capsule(80.0, 30.0).at(300.0, 100.0, -40.0),
        "Pawn",
    )?;
    world.add_collider_with_profile(
        SceneCollider::cuboid(5.0, 200.0, 200.0).at(150.0, 0.0, 0.0),
        "InvisibleWall",
    )?;
    Ok(world)
}

/// Distance at which the shading ramp bottoms out.
const FAR: f32 = 800.0;

fn shade(color: LinearColor, max_distance: f32) -> char {
    if color == MISS_COLOR {
        return ' ';
    }
    const RAMP: &[u8] = b"@%#*+=-:.";
    let t = (color.a * max_distance / FAR).clamp(0.0, 0.999);
    RAMP[(t * RAMP.len() as f32) as usize] as char
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            DebuggerConfig::from_json_str(&text)?
        }
        None => DebuggerConfig {
            tile_size: 16,
            ..Default::default()
        },
    };
    let settings: Option<RenderSettings> = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            Some(serde_json::from_str(&text)?)
        }
        None => None,
    };

    let world = build_world()?;
    let host = StaticHost::from_world(
        &world,
        Some(CameraPose::from_yaw_pitch_roll(Point3::new(0.0, 0.0, 0.0), 0.0, 0.0, 0.0)),
    );
    let surface = Arc::new(MemorySurface::new(WIDTH, HEIGHT));
    let provider = StaticSurfaceProvider::new(surface.clone());

    let mut controller = RunController::new(config, Box::new(host), Box::new(provider), Arc::new(world))?;
    if let Some(settings) = &settings {
        controller.apply_render_settings(settings);
    }
    tracing::info!(test = ?controller.test_configuration(), "scanning");

    let tiles_x = WIDTH.div_ceil(controller.config().tile_size);
    let tiles_y = HEIGHT.div_ceil(controller.config().tile_size);
    let sweep = u64::from(tiles_x * tiles_y);

    controller.enable();
    while surface.upload_count() < sweep {
        controller.tick(1.0 / 60.0);
        std::thread::sleep(Duration::from_millis(1));
    }
    controller.shutdown();

    let max_distance = controller.config().max_distance;
    let texels = surface.snapshot();
    for row in texels.chunks(WIDTH as usize) {
        let line: String = row.iter().map(|c| shade(*c, max_distance)).collect();
        println!("{line}");
    }

    let diagnostics = controller.diagnostics();
    tracing::info!(
        tiles = diagnostics.tiles_rendered,
        uploads_failed = diagnostics.uploads_failed,
        last_job_us = diagnostics.last_job_time.as_micros() as u64,
        "scan complete"
    );
    Ok(())
}
