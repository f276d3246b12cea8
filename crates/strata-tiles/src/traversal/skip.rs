//! Breadth-first traversal that jumps over intermediate levels of detail.
//!
//! Each level of the breadth-first pass runs a depth-first search from every
//! queued tile. The search stops early at tiles far enough below a loaded
//! ancestor, so the loader fetches them directly instead of every level in
//! between; the ancestor stands in until they arrive.

use std::mem;

use crate::buffers::ScratchBuffer;
use crate::{ChildrenVisibility, Refine, TileCache, TileId, Tileset, ViewState};

impl Tileset {
    /// Whether `tile` may be loaded directly while `ancestor` is drawn.
    pub(crate) fn reached_skipping_threshold(&self, ancestor: TileId, tile: TileId) -> bool {
        let config = &self.config;
        if config.immediately_load_desired_level_of_detail || ancestor == tile {
            return false;
        }
        let ancestor = &self.tiles[ancestor.index()];
        let tile = &self.tiles[tile.index()];
        tile.has_renderable_content()
            && tile.screen_space_error
                < ancestor.screen_space_error / config.skip_screen_space_error_factor
            && tile.depth.saturating_sub(ancestor.depth) > config.skip_levels
    }

    pub(crate) fn execute_skip_traversal(
        &mut self,
        view: &ViewState,
        cache: &mut dyn TileCache,
        seeds: &[TileId],
    ) {
        let mut queue = mem::take(&mut self.buffers.skip_queue);
        let mut next = mem::take(&mut self.buffers.skip_next_queue);
        queue.clear();
        queue.extend_from_slice(seeds);

        while !queue.is_empty() {
            next.clear();
            for index in 0..queue.len() {
                self.skip_from(queue[index], view, cache, &mut next);
            }
            mem::swap(&mut queue, &mut next);
        }

        next.clear();
        self.buffers.skip_queue = queue;
        self.buffers.skip_next_queue = next;
    }

    /// Depth-first search rooted at `root`. Tiles where the search stops are
    /// pushed to `next` to root the following level.
    fn skip_from(
        &mut self,
        root: TileId,
        view: &ViewState,
        cache: &mut dyn TileCache,
        next: &mut ScratchBuffer,
    ) {
        let frame = view.frame_number;
        let mut stack = mem::take(&mut self.buffers.skip_stack);
        stack.clear();
        stack.push(root);

        while let Some(id) = stack.pop() {
            if !self.tiles[id.index()].visible {
                continue;
            }
            self.visit_tile(id, frame);
            self.touch(id, frame, cache);

            if self.refine_skip(id, view, cache) {
                for &child in &self.tiles[id.index()].children {
                    if self.tiles[child.index()].visible {
                        stack.push(child);
                    }
                }
                continue;
            }

            let tile = &self.tiles[id.index()];
            if id != root {
                if tile.refine == Refine::Replace && !tile.content_unloaded() {
                    self.desire(id, frame);
                }
                next.push(id);
            } else if tile.refine == Refine::Replace {
                self.load_with_siblings(id, frame);
                if self.tiles[id.index()].has_renderable_content() {
                    self.desire(id, frame);
                }
            }
        }

        self.buffers.skip_stack = stack;
    }

    fn refine_skip(&mut self, id: TileId, view: &ViewState, cache: &mut dyn TileCache) -> bool {
        let frame = view.frame_number;
        let maximum_error = self.config.maximum_screen_space_error;

        let tile = &self.tiles[id.index()];
        if tile.refine == Refine::Additive && tile.has_renderable_content() {
            let priority = tile.screen_space_error;
            self.request(id, priority, frame);
            self.desire(id, frame);
        }

        let tile = &self.tiles[id.index()];
        if tile.screen_space_error <= maximum_error {
            return false;
        }

        if tile.has_unloaded_renderable_content()
            && let Some(ancestor) = tile.ancestor_with_content_available
            && self.reached_skipping_threshold(ancestor, id)
        {
            return false;
        }

        let visibility = self.update_children(id, view);
        let tile = &self.tiles[id.index()];
        let refine = tile.refine;
        let has_children = !tile.children.is_empty();
        let show_additive = refine == Refine::Additive;
        let show_replacement = refine == Refine::Replace
            && visibility.contains(ChildrenVisibility::VISIBLE_IN_REQUEST_VOLUME);

        // A visible child the viewer is outside the request volume of leaves
        // a hole only this tile can fill.
        if refine == Refine::Replace
            && visibility.contains(ChildrenVisibility::VISIBLE_NOT_IN_REQUEST_VOLUME)
        {
            self.desire(id, frame);
        }

        if !(show_additive || show_replacement) || !has_children {
            return false;
        }
        for index in 0..self.tiles[id.index()].children.len() {
            let child = self.tiles[id.index()].children[index];
            self.touch(child, frame, cache);
        }
        true
    }

    /// Request a tile picked by the skip traversal, plus its siblings when
    /// `load_siblings` is set so panning does not reveal holes.
    fn load_with_siblings(&mut self, id: TileId, frame: u64) {
        let priority = self.tiles[id.index()].screen_space_error;
        self.request(id, priority, frame);

        if !self.config.load_siblings {
            return;
        }
        let Some(parent) = self.tiles[id.index()].parent else {
            return;
        };
        for index in 0..self.tiles[parent.index()].children.len() {
            let sibling = self.tiles[parent.index()].children[index];
            let priority = self.tiles[sibling.index()].screen_space_error;
            self.request(sibling, priority, frame);
        }
    }
}
