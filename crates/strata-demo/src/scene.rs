//! Synthetic terrain tileset used by the demo.

use glam::DVec3;
use rand::Rng;
use strata_config::TraversalConfig;
use strata_cull::BoundingVolume;
use strata_tiles::{Refine, TileDescriptor, TileId, Tileset, TilesetBuilder, TilesetError};

/// Side length of the terrain square in meters.
pub const TERRAIN_SIZE: f64 = 8192.0;

const LEVELS: u32 = 7;
const ROOT_ERROR: f64 = 512.0;

/// Build a quadtree over a gently bumpy terrain square in the XY plane.
///
/// The root carries no content. Every tile below it has terrain content of a
/// random size, and a few level-2 tiles carry an additive overlay child
/// (buildings drawn on top of the terrain).
pub fn build_terrain<R: Rng>(rng: &mut R, config: TraversalConfig) -> Result<Tileset, TilesetError> {
    let mut builder = TilesetBuilder::new()
        .geometric_error(ROOT_ERROR * 2.0)
        .up_axis(DVec3::Z)
        .config(config);

    let half = TERRAIN_SIZE / 2.0;
    let root = builder.add_root(TileDescriptor::new(column(rng, -half, -half, TERRAIN_SIZE), ROOT_ERROR));

    let mut frontier: Vec<(TileId, f64, f64, f64)> = vec![(root, -half, -half, TERRAIN_SIZE)];
    for level in 1..LEVELS {
        let error = if level + 1 == LEVELS {
            0.0
        } else {
            ROOT_ERROR / f64::from(1u32 << level)
        };
        let mut next = Vec::with_capacity(frontier.len() * 4);
        for (parent, x, y, size) in frontier {
            let quarter = size / 2.0;
            for (dx, dy) in [(0.0, 0.0), (quarter, 0.0), (0.0, quarter), (quarter, quarter)] {
                let bytes = rng.gen_range(16 * 1024..256 * 1024);
                let descriptor =
                    TileDescriptor::new(column(rng, x + dx, y + dy, quarter), error).with_content(bytes);
                let child = builder.add_child(parent, descriptor);
                if level == 2 && rng.gen_bool(0.25) {
                    add_overlay(&mut builder, rng, child, x + dx, y + dy, quarter, error);
                }
                next.push((child, x + dx, y + dy, quarter));
            }
        }
        frontier = next;
    }

    builder.build()
}

/// Terrain column over a square with a random height span.
fn column<R: Rng>(rng: &mut R, x: f64, y: f64, size: f64) -> BoundingVolume {
    let low = rng.gen_range(-40.0..0.0);
    let high = rng.gen_range(10.0..120.0);
    BoundingVolume::aabb(DVec3::new(x, y, low), DVec3::new(x + size, y + size, high))
}

/// Additive building layer only loaded when the viewer is within range.
fn add_overlay<R: Rng>(
    builder: &mut TilesetBuilder,
    rng: &mut R,
    parent: TileId,
    x: f64,
    y: f64,
    size: f64,
    error: f64,
) {
    let center = DVec3::new(x + size / 2.0, y + size / 2.0, 0.0);
    let buildings = BoundingVolume::aabb(DVec3::new(x, y, 0.0), DVec3::new(x + size, y + size, 200.0));
    let request_volume = BoundingVolume::aabb(
        center - DVec3::new(size * 1.5, size * 1.5, 0.0),
        center + DVec3::new(size * 1.5, size * 1.5, 2000.0),
    );
    let descriptor = TileDescriptor::new(buildings, error / 2.0)
        .with_refine(Refine::Additive)
        .with_content(rng.gen_range(64 * 1024..512 * 1024))
        .with_viewer_request_volume(request_volume);
    builder.add_child(parent, descriptor);
}
