//! Scratch storage reused by the traversal passes across frames.

use std::ops::{Deref, DerefMut};

use crate::TileId;

/// A growable tile list that remembers how long it got during the current
/// run, so its capacity can be trimmed back afterwards.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScratchBuffer {
    items: Vec<TileId>,
    high_water: usize,
}

impl ScratchBuffer {
    pub(crate) fn push(&mut self, tile: TileId) {
        self.items.push(tile);
        self.high_water = self.high_water.max(self.items.len());
    }

    pub(crate) fn extend_from_slice(&mut self, tiles: &[TileId]) {
        self.items.extend_from_slice(tiles);
        self.high_water = self.high_water.max(self.items.len());
    }

    pub(crate) fn extend<I: IntoIterator<Item = TileId>>(&mut self, tiles: I) {
        self.items.extend(tiles);
        self.high_water = self.high_water.max(self.items.len());
    }

    /// Shrink the backing storage to the longest length seen since the last
    /// trim.
    fn trim(&mut self) {
        self.items.clear();
        self.items.shrink_to(self.high_water);
        self.high_water = 0;
    }
}

// Read and remove access only; growth goes through `push` so the high-water
// mark stays accurate.
impl Deref for ScratchBuffer {
    type Target = Vec<TileId>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl DerefMut for ScratchBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

/// Stacks and queues owned by one tileset. Never shared between tilesets, so
/// distinct tilesets can be traversed on different threads.
#[derive(Clone, Debug, Default)]
pub struct TraversalBuffers {
    pub(crate) base_stack: ScratchBuffer,
    pub(crate) probe_stack: ScratchBuffer,
    pub(crate) skip_queue: ScratchBuffer,
    pub(crate) skip_next_queue: ScratchBuffer,
    pub(crate) skip_stack: ScratchBuffer,
    pub(crate) leaves: ScratchBuffer,
    pub(crate) descendant_stack: ScratchBuffer,
    pub(crate) selection_stack: ScratchBuffer,
    pub(crate) ancestor_stack: ScratchBuffer,
    pub(crate) child_scratch: ScratchBuffer,
}

impl TraversalBuffers {
    fn all(&self) -> [&ScratchBuffer; 10] {
        [
            &self.base_stack,
            &self.probe_stack,
            &self.skip_queue,
            &self.skip_next_queue,
            &self.skip_stack,
            &self.leaves,
            &self.descendant_stack,
            &self.selection_stack,
            &self.ancestor_stack,
            &self.child_scratch,
        ]
    }

    /// Total reserved slots across all buffers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.all().iter().map(|buffer| buffer.items.capacity()).sum()
    }

    /// Longest length any buffer reached since the last trim.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.all()
            .iter()
            .map(|buffer| buffer.high_water)
            .max()
            .unwrap_or(0)
    }

    /// Release storage beyond what the last run actually used.
    pub(crate) fn trim(&mut self) {
        for buffer in [
            &mut self.base_stack,
            &mut self.probe_stack,
            &mut self.skip_queue,
            &mut self.skip_next_queue,
            &mut self.skip_stack,
            &mut self.leaves,
            &mut self.descendant_stack,
            &mut self.selection_stack,
            &mut self.ancestor_stack,
            &mut self.child_scratch,
        ] {
            buffer.trim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_water_tracks_longest_length() {
        let mut buffer = ScratchBuffer::default();
        for i in 0..10 {
            buffer.push(TileId(i));
        }
        buffer.truncate(2);
        buffer.push(TileId(99));
        assert_eq!(buffer.high_water, 10);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_trim_shrinks_to_last_run() {
        let mut buffers = TraversalBuffers::default();
        for i in 0..1000 {
            buffers.base_stack.push(TileId(i));
        }
        buffers.trim();
        assert_eq!(buffers.high_water_mark(), 0);
        let after_large = buffers.capacity();
        assert!(after_large >= 1000);

        buffers.base_stack.extend_from_slice(&[TileId(1), TileId(2)]);
        buffers.trim();
        assert!(buffers.capacity() < after_large);
        assert!(buffers.base_stack.is_empty());
    }
}
