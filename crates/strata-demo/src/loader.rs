//! Simulated content loader with latency, failures and a memory budget.

use rand::Rng;
use rand_xoshiro::Xoshiro256StarStar;
use strata_config::CacheConfig;
use strata_tiles::{ContentState, LruTileCache, RequestQueue, Tile, TileId, Tileset, TilesetError};
use tracing::{debug, trace};

const FAILURE_RATE: f64 = 0.01;
const MAX_LATENCY_FRAMES: u64 = 6;

#[derive(Debug)]
struct InFlight {
    tile: TileId,
    ready_frame: u64,
    fails: bool,
}

/// Loader counters for the whole run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoaderStats {
    pub started: u64,
    pub loaded: u64,
    pub failed: u64,
    pub evicted: u64,
}

/// Drains the tileset's requests each frame and fakes network loads.
pub struct SimulatedLoader {
    queue: RequestQueue,
    in_flight: Vec<InFlight>,
    cache: LruTileCache,
    max_requests_per_frame: usize,
    rng: Xoshiro256StarStar,
    stats: LoaderStats,
}

impl SimulatedLoader {
    pub fn new(config: &CacheConfig, rng: Xoshiro256StarStar) -> Self {
        Self {
            queue: RequestQueue::new(),
            in_flight: Vec::new(),
            cache: LruTileCache::new(config.maximum_memory_usage_bytes()),
            max_requests_per_frame: config.max_requests_per_frame as usize,
            rng,
            stats: LoaderStats::default(),
        }
    }

    /// Cache the traversal reports recency to.
    pub fn cache_mut(&mut self) -> &mut LruTileCache {
        &mut self.cache
    }

    #[must_use]
    pub fn cache(&self) -> &LruTileCache {
        &self.cache
    }

    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Finish loads that are due, start new ones from this frame's requests
    /// and unload whatever the cache budget no longer allows.
    pub fn update(&mut self, tileset: &mut Tileset, frame: u64) -> Result<(), TilesetError> {
        self.complete(tileset, frame)?;
        self.start(tileset, frame)?;
        self.evict(tileset)
    }

    fn complete(&mut self, tileset: &mut Tileset, frame: u64) -> Result<(), TilesetError> {
        let (done, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|load| load.ready_frame <= frame);
        self.in_flight = pending;

        for load in done {
            if load.fails {
                tileset.set_content_state(load.tile, ContentState::Failed)?;
                self.stats.failed += 1;
                continue;
            }
            let bytes = tileset.tile(load.tile).map_or(0, Tile::byte_length);
            tileset.set_content_state(load.tile, ContentState::Available)?;
            self.cache.on_content_loaded(load.tile, bytes);
            self.stats.loaded += 1;
            trace!("{} loaded ({bytes} bytes)", load.tile);
        }
        Ok(())
    }

    fn start(&mut self, tileset: &mut Tileset, frame: u64) -> Result<(), TilesetError> {
        // Requests are only valid for the frame that produced them.
        self.queue.clear();
        self.queue.extend_from_slice(tileset.requested_tiles());

        let budget = self.max_requests_per_frame.saturating_sub(self.in_flight.len());
        for _ in 0..budget {
            let Some(request) = self.queue.pop() else {
                break;
            };
            tileset.set_content_state(request.tile, ContentState::Loading)?;
            let latency = self.rng.gen_range(1..=MAX_LATENCY_FRAMES);
            self.in_flight.push(InFlight {
                tile: request.tile,
                ready_frame: frame + latency,
                fails: self.rng.gen_bool(FAILURE_RATE),
            });
            self.stats.started += 1;
        }
        if !self.queue.is_empty() {
            debug!("{} requests deferred to later frames", self.queue.len());
        }
        Ok(())
    }

    fn evict(&mut self, tileset: &mut Tileset) -> Result<(), TilesetError> {
        for tile in self.cache.select_evictions() {
            tileset.set_content_state(tile, ContentState::Unloaded)?;
            self.cache.on_content_unloaded(tile);
            self.stats.evicted += 1;
        }
        Ok(())
    }
}
