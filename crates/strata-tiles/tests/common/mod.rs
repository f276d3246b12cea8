#![allow(dead_code)]

use std::f64::consts::FRAC_PI_2;

use glam::DVec3;
use rustc_hash::FxHashMap;
use strata_config::TraversalConfig;
use strata_cull::{BoundingVolume, Camera, Projection};
use strata_tiles::{
    ContentState, TileCache, TileDescriptor, TileId, Tileset, TilesetBuilder, ViewState, Viewport,
};

/// Square viewport so a 90° frustum gives `sse = ge * 500 / distance`.
pub const VIEWPORT: Viewport = Viewport {
    width: 1000,
    height: 1000,
};

pub fn cube(center: DVec3, half: f64) -> BoundingVolume {
    BoundingVolume::aabb(center - DVec3::splat(half), center + DVec3::splat(half))
}

/// A cube whose near face is `distance` in front of a camera at the origin
/// looking down -Z.
pub fn cube_at_distance(distance: f64, half: f64) -> BoundingVolume {
    cube(DVec3::new(0.0, 0.0, -(distance + half)), half)
}

pub fn camera_at(position: DVec3, target: DVec3) -> Camera {
    let mut camera = Camera::looking_at(position, target, DVec3::Y);
    camera.projection = Projection::Perspective {
        fov_y: FRAC_PI_2,
        aspect_ratio: 1.0,
    };
    camera
}

pub fn view_from(frame: u64, position: DVec3, target: DVec3) -> ViewState {
    ViewState::new(frame, camera_at(position, target), VIEWPORT)
}

/// Camera at the origin looking down -Z.
pub fn front_view(frame: u64) -> ViewState {
    view_from(frame, DVec3::ZERO, DVec3::NEG_Z)
}

pub fn set_available(tileset: &mut Tileset, tiles: &[TileId]) {
    for &tile in tiles {
        tileset.set_content_state(tile, ContentState::Available).unwrap();
    }
}

pub fn requested(tileset: &Tileset) -> Vec<TileId> {
    tileset.requested_tiles().iter().map(|request| request.tile).collect()
}

/// Cache that records every call it receives.
#[derive(Default)]
pub struct RecordingCache {
    pub resets: usize,
    pub touches: Vec<TileId>,
}

impl RecordingCache {
    pub fn touch_counts(&self) -> FxHashMap<TileId, usize> {
        let mut counts = FxHashMap::default();
        for tile in &self.touches {
            *counts.entry(*tile).or_insert(0) += 1;
        }
        counts
    }
}

impl TileCache for RecordingCache {
    fn reset(&mut self) {
        self.resets += 1;
        self.touches.clear();
    }

    fn touch(&mut self, tile: TileId) {
        self.touches.push(tile);
    }
}

/// Replace-refined quadtree over a flat slab 50 units in front of the
/// camera. Errors halve per level; leaves have zero error.
pub fn quadtree(levels: u32, config: TraversalConfig) -> (Tileset, Vec<TileId>) {
    let mut builder = TilesetBuilder::new().config(config);
    let mut ids = Vec::new();

    let root_error = |level: u32| {
        if level + 1 == levels {
            0.0
        } else {
            64.0 / f64::from(1u32 << level)
        }
    };
    let slab = |min_x: f64, min_y: f64, size: f64| {
        BoundingVolume::aabb(
            DVec3::new(min_x, min_y, -51.0),
            DVec3::new(min_x + size, min_y + size, -49.0),
        )
    };

    let root = builder.add_root(TileDescriptor::new(slab(-200.0, -200.0, 400.0), root_error(0)).with_content(1024));
    ids.push(root);

    let mut frontier = vec![(root, -200.0, -200.0, 400.0)];
    for level in 1..levels {
        let mut next = Vec::new();
        for (parent, x, y, size) in frontier {
            let half = size / 2.0;
            for (dx, dy) in [(0.0, 0.0), (half, 0.0), (0.0, half), (half, half)] {
                let child = builder.add_child(
                    parent,
                    TileDescriptor::new(slab(x + dx, y + dy, half), root_error(level)).with_content(1024),
                );
                ids.push(child);
                next.push((child, x + dx, y + dy, half));
            }
        }
        frontier = next;
    }

    (builder.build().unwrap(), ids)
}
