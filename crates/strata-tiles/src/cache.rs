//! Content cache interface and a recency-based implementation.
//!
//! The traversal only signals recency: [`TileCache::reset`] once at the start
//! of a frame and [`TileCache::touch`] for every tile it still needs. Deciding
//! what to unload, and when, is up to the cache owner.

use rustc_hash::FxHashMap;

use crate::TileId;

/// Recency sink the traversal reports to.
pub trait TileCache {
    /// Start a new frame: every entry becomes a replacement candidate until
    /// touched again.
    fn reset(&mut self);

    /// Mark a tile as needed this frame.
    fn touch(&mut self, tile: TileId);
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    bytes: u64,
    /// Clock value of the last touch (or load).
    last_touched: u64,
}

/// Least-recently-used cache over loaded tile content with a byte budget.
#[derive(Debug)]
pub struct LruTileCache {
    entries: FxHashMap<TileId, CacheEntry>,
    budget_bytes: u64,
    total_bytes: u64,
    /// Monotonic counter advanced by every touch.
    clock: u64,
    /// Clock value at the last reset; entries touched before it are candidates.
    frame_start: u64,
    trim_requested: bool,
}

impl LruTileCache {
    #[must_use]
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            entries: FxHashMap::default(),
            budget_bytes,
            total_bytes: 0,
            clock: 0,
            frame_start: 0,
            trim_requested: false,
        }
    }

    /// Record that a tile's content finished loading. Newly loaded content
    /// counts as touched this frame.
    pub fn on_content_loaded(&mut self, tile: TileId, bytes: u64) {
        self.clock += 1;
        let entry = CacheEntry {
            bytes,
            last_touched: self.clock,
        };
        if let Some(old) = self.entries.insert(tile, entry) {
            self.total_bytes -= old.bytes;
        }
        self.total_bytes += bytes;
    }

    /// Record that a tile's content was unloaded.
    pub fn on_content_unloaded(&mut self, tile: TileId) {
        if let Some(entry) = self.entries.remove(&tile) {
            self.total_bytes -= entry.bytes;
        }
    }

    /// Evict every candidate on the next [`select_evictions`](Self::select_evictions),
    /// regardless of the budget.
    pub fn trim(&mut self) {
        self.trim_requested = true;
    }

    /// Tiles to unload, least recently used first.
    ///
    /// Only entries not touched since the last reset are considered. Stops as
    /// soon as the freed bytes cover the overage, unless a trim was requested.
    /// The caller unloads the content and reports back through
    /// [`on_content_unloaded`](Self::on_content_unloaded).
    pub fn select_evictions(&mut self) -> Vec<TileId> {
        let trim = std::mem::take(&mut self.trim_requested);
        let overage = self.overage();
        if !trim && overage == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.last_touched <= self.frame_start)
            .map(|(tile, entry)| (*tile, *entry))
            .collect();
        candidates.sort_by_key(|(tile, entry)| (entry.last_touched, *tile));

        let mut evictions = Vec::new();
        let mut freed = 0u64;
        for (tile, entry) in candidates {
            if !trim && freed >= overage {
                break;
            }
            freed += entry.bytes;
            evictions.push(tile);
        }
        evictions
    }

    /// Bytes above the budget (0 if within budget).
    #[must_use]
    pub fn overage(&self) -> u64 {
        self.total_bytes.saturating_sub(self.budget_bytes)
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total_bytes > self.budget_bytes
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }

    pub fn set_budget_bytes(&mut self, budget_bytes: u64) {
        self.budget_bytes = budget_bytes;
    }

    #[must_use]
    pub fn contains(&self, tile: TileId) -> bool {
        self.entries.contains_key(&tile)
    }

    /// Number of tiles with loaded content.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TileCache for LruTileCache {
    fn reset(&mut self) {
        self.frame_start = self.clock;
    }

    fn touch(&mut self, tile: TileId) {
        if let Some(entry) = self.entries.get_mut(&tile) {
            self.clock += 1;
            entry.last_touched = self.clock;
        }
    }
}
