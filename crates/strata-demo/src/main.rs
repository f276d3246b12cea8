//! Demo binary that streams a synthetic terrain tileset along a camera flight.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo` for the default flight.
//! Run with `cargo run -p strata-demo -- --skip-lod true --cache-mb 64` to stress eviction.

mod loader;
mod scene;

use clap::Parser;
use glam::DVec3;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use strata_config::{CliArgs, Config, default_config_dir};
use strata_tiles::{ViewState, Viewport};
use tracing::{error, info};

use crate::loader::SimulatedLoader;
use crate::scene::TERRAIN_SIZE;

/// Camera position and target for flight progress `t` in `[0, 1]`.
///
/// Starts high over one corner and descends towards the middle of the
/// terrain while looking ahead of itself.
fn flight_path(t: f64) -> (DVec3, DVec3) {
    let start = DVec3::new(-0.45 * TERRAIN_SIZE, -0.45 * TERRAIN_SIZE, 3000.0);
    let end = DVec3::new(0.1 * TERRAIN_SIZE, 0.1 * TERRAIN_SIZE, 80.0);
    let position = start.lerp(end, t);
    let ahead = DVec3::new(0.25 * TERRAIN_SIZE, 0.25 * TERRAIN_SIZE, 0.0);
    (position, DVec3::new(position.x, position.y, 0.0) + ahead)
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.traversal.validate() {
        error!("Invalid configuration: {e}");
        return;
    }

    let mut rng = Xoshiro256StarStar::seed_from_u64(42); // Fixed seed for reproducible runs
    let mut tileset = match scene::build_terrain(&mut rng, config.traversal.clone()) {
        Ok(tileset) => tileset,
        Err(e) => {
            error!("Failed to build terrain tileset: {e}");
            return;
        }
    };
    info!(
        "Terrain tileset: {} tiles, skip LOD {}, max SSE {}",
        tileset.len(),
        config.traversal.skip_level_of_detail,
        config.traversal.maximum_screen_space_error
    );

    let mut loader = SimulatedLoader::new(&config.cache, Xoshiro256StarStar::seed_from_u64(7));
    let viewport = Viewport::new(config.view.width, config.view.height);
    let mut camera = ViewState::camera_from_config(&config.view);

    let frames = u64::from(args.frames.max(1));
    let mut peak_selected = 0;
    for frame in 1..=frames {
        let t = (frame - 1) as f64 / (frames.max(2) - 1) as f64;
        let (position, target) = flight_path(t);
        camera.position = position;
        camera.look_at(target, DVec3::Z);

        let view = ViewState::new(frame, camera.clone(), viewport);
        tileset.select_tiles(&view, loader.cache_mut());
        peak_selected = peak_selected.max(tileset.selected_tiles().len());

        if config.debug.log_statistics {
            info!(
                "frame {frame}: {} | styled {} | in flight {} | cache {} KiB",
                tileset.statistics(),
                tileset.selected_tiles_to_style().len(),
                loader.in_flight(),
                loader.cache().total_bytes() / 1024
            );
        }

        if let Err(e) = loader.update(&mut tileset, frame) {
            error!("Loader rejected a tile: {e}");
            return;
        }
    }

    let stats = loader.stats();
    info!(
        "Flight finished after {frames} frames: peak selection {peak_selected}, {} loads started, {} loaded, {} failed, {} evicted",
        stats.started, stats.loaded, stats.failed, stats.evicted
    );
    info!(
        "Cache holds {} tiles ({} KiB of {} KiB), traversal buffers hold {} slots",
        loader.cache().len(),
        loader.cache().total_bytes() / 1024,
        loader.cache().budget_bytes() / 1024,
        tileset.buffers().capacity()
    );
}
