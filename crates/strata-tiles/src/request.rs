//! Load requests produced by the traversal, and a priority queue a loader can
//! drain them through.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::TileId;

/// A tile whose content the traversal wants loaded.
///
/// Higher priority means more visual impact: it is the screen-space error of
/// the tile (or, for children requested during refinement, of the parent).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadRequest {
    pub tile: TileId,
    pub priority: f64,
}

#[derive(Clone, Debug)]
struct QueueEntry {
    request: LoadRequest,
    /// Generation counter to skip stale entries after priority updates.
    generation: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.request
            .priority
            .total_cmp(&other.request.priority)
            // Earlier pushes win ties.
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Max-priority queue of load requests.
///
/// Pushing a tile that is already queued replaces its priority, so a loader
/// can feed every frame's requests in without deduplicating first.
#[derive(Default)]
pub struct RequestQueue {
    heap: BinaryHeap<QueueEntry>,
    /// Current generation per queued tile.
    generations: FxHashMap<TileId, u64>,
    next_generation: u64,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a request.
    pub fn push(&mut self, request: LoadRequest) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(request.tile, generation);
        self.heap.push(QueueEntry {
            request,
            generation,
        });
    }

    /// Queue every request of a frame.
    pub fn extend_from_slice(&mut self, requests: &[LoadRequest]) {
        for request in requests {
            self.push(*request);
        }
    }

    /// Remove and return the highest-priority request.
    pub fn pop(&mut self) -> Option<LoadRequest> {
        while let Some(entry) = self.heap.pop() {
            if self.generations.get(&entry.request.tile) == Some(&entry.generation) {
                self.generations.remove(&entry.request.tile);
                return Some(entry.request);
            }
        }
        None
    }

    /// Drop a queued request, e.g. when the tile got evicted or cancelled.
    pub fn remove(&mut self, tile: TileId) -> bool {
        self.generations.remove(&tile).is_some()
    }

    #[must_use]
    pub fn contains(&self, tile: TileId) -> bool {
        self.generations.contains_key(&tile)
    }

    /// Number of valid entries in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.generations.clear();
    }
}
