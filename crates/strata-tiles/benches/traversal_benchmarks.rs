use std::f64::consts::FRAC_PI_2;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::DVec3;
use strata_config::TraversalConfig;
use strata_cull::{BoundingVolume, Camera, Projection};
use strata_tiles::{
    ContentState, LruTileCache, TileDescriptor, Tileset, TilesetBuilder, ViewState,
    Viewport,
};

const LEVELS: u32 = 7;

/// Replace-refined quadtree over a 4 km slab with every tile loaded.
fn loaded_quadtree(config: TraversalConfig) -> (Tileset, LruTileCache) {
    let mut builder = TilesetBuilder::new().config(config);
    let slab = |x: f64, y: f64, size: f64| {
        BoundingVolume::aabb(DVec3::new(x, y, -1.0), DVec3::new(x + size, y + size, 1.0))
    };
    let error = |level: u32| {
        if level + 1 == LEVELS {
            0.0
        } else {
            256.0 / f64::from(1u32 << level)
        }
    };

    let root = builder.add_root(TileDescriptor::new(slab(-2000.0, -2000.0, 4000.0), error(0)).with_content(4096));
    let mut ids = vec![root];
    let mut frontier = vec![(root, -2000.0, -2000.0, 4000.0)];
    for level in 1..LEVELS {
        let mut next = Vec::with_capacity(frontier.len() * 4);
        for (parent, x, y, size) in frontier {
            let half = size / 2.0;
            for (dx, dy) in [(0.0, 0.0), (half, 0.0), (0.0, half), (half, half)] {
                let descriptor = TileDescriptor::new(slab(x + dx, y + dy, half), error(level)).with_content(4096);
                let child = builder.add_child(parent, descriptor);
                ids.push(child);
                next.push((child, x + dx, y + dy, half));
            }
        }
        frontier = next;
    }

    let mut tileset = builder.build().expect("valid quadtree");
    let mut cache = LruTileCache::new(u64::MAX);
    for &id in &ids {
        tileset
            .set_content_state(id, ContentState::Available)
            .expect("known tile");
        cache.on_content_loaded(id, 4096);
    }
    (tileset, cache)
}

fn oblique_view(frame: u64) -> ViewState {
    let mut camera = Camera::looking_at(DVec3::new(0.0, -600.0, 150.0), DVec3::new(0.0, 400.0, 0.0), DVec3::Z);
    camera.projection = Projection::Perspective {
        fov_y: FRAC_PI_2,
        aspect_ratio: 16.0 / 9.0,
    };
    ViewState::new(frame, camera, Viewport::new(1920, 1080))
}

fn bench_select(c: &mut Criterion, name: &str, config: TraversalConfig) {
    let (mut tileset, mut cache) = loaded_quadtree(config);
    let mut frame = 0u64;
    c.bench_function(name, |bencher| {
        bencher.iter(|| {
            frame += 1;
            tileset.select_tiles(&oblique_view(frame), &mut cache);
            black_box(tileset.selected_tiles().len())
        })
    });
}

fn bench_base_traversal(c: &mut Criterion) {
    bench_select(c, "select_tiles_base", TraversalConfig::default());
}

fn bench_skip_traversal(c: &mut Criterion) {
    let config = TraversalConfig {
        skip_level_of_detail: true,
        ..TraversalConfig::default()
    };
    bench_select(c, "select_tiles_skip", config);
}

fn bench_hybrid_traversal(c: &mut Criterion) {
    let config = TraversalConfig {
        skip_level_of_detail: true,
        base_screen_space_error: 256.0,
        ..TraversalConfig::default()
    };
    bench_select(c, "select_tiles_hybrid", config);
}

fn bench_lru_evictions(c: &mut Criterion) {
    let (mut tileset, mut cache) = loaded_quadtree(TraversalConfig::default());
    tileset.select_tiles(&oblique_view(1), &mut cache);
    c.bench_function("lru_select_evictions", |bencher| {
        bencher.iter(|| {
            cache.trim();
            black_box(cache.select_evictions().len())
        })
    });
}

fn bench_set_content_state(c: &mut Criterion) {
    let (mut tileset, _) = loaded_quadtree(TraversalConfig::default());
    let root = tileset.root();
    c.bench_function("set_content_state", |bencher| {
        bencher.iter(|| {
            tileset
                .set_content_state(black_box(root), ContentState::Available)
                .expect("known tile")
        })
    });
}

criterion_group!(
    benches,
    bench_base_traversal,
    bench_skip_traversal,
    bench_hybrid_traversal,
    bench_lru_evictions,
    bench_set_content_state,
);
criterion_main!(benches);
