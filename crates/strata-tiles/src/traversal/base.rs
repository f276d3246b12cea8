//! Depth-first refinement down to an error threshold.

use std::mem;

use tracing::trace;

use crate::{ChildrenVisibility, Refine, TileCache, TileId, Tileset, ViewState};

/// What the base traversal does with the tiles it stops at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BaseMode {
    /// Leaves with replace-refined content are desired directly.
    Plain,
    /// Leaves are collected to seed the skip traversal.
    Hybrid,
}

impl Tileset {
    /// Refine from the root until every visible tile meets `threshold` or
    /// cannot be refined yet. Returns whether no replace-refined tile had to
    /// stop because its children were still loading.
    ///
    /// In [`BaseMode::Hybrid`] the leaves are left in the `leaves` buffer.
    pub(crate) fn execute_base_traversal(
        &mut self,
        view: &ViewState,
        cache: &mut dyn TileCache,
        threshold: f64,
        mode: BaseMode,
    ) -> bool {
        let frame = view.frame_number;
        let mut stack = mem::take(&mut self.buffers.base_stack);
        let mut leaves = mem::take(&mut self.buffers.leaves);
        stack.clear();
        leaves.clear();
        stack.push(self.root);

        let mut fully_refined = true;
        while let Some(id) = stack.pop() {
            if !self.tiles[id.index()].visible {
                continue;
            }
            self.visit_tile(id, frame);
            self.touch(id, frame, cache);

            if self.refine_base(id, view, cache, threshold, &mut fully_refined) {
                for &child in &self.tiles[id.index()].children {
                    if self.tiles[child.index()].visible {
                        stack.push(child);
                    }
                }
                continue;
            }

            match mode {
                BaseMode::Plain => {
                    let tile = &self.tiles[id.index()];
                    if tile.refine == Refine::Replace && tile.has_renderable_content() {
                        self.desire(id, frame);
                    }
                }
                BaseMode::Hybrid => leaves.push(id),
            }
        }

        self.buffers.base_stack = stack;
        self.buffers.leaves = leaves;
        fully_refined
    }

    /// Decide whether the traversal continues into the children of `id`,
    /// requesting and touching them when it does.
    fn refine_base(
        &mut self,
        id: TileId,
        view: &ViewState,
        cache: &mut dyn TileCache,
        threshold: f64,
        fully_refined: &mut bool,
    ) -> bool {
        let frame = view.frame_number;
        let tile = &self.tiles[id.index()];
        if tile.refine == Refine::Additive && tile.has_renderable_content() {
            self.desire(id, frame);
        }

        let tile = &self.tiles[id.index()];
        if tile.screen_space_error <= threshold {
            self.update_children(id, view);
            return false;
        }

        let visibility = self.update_children(id, view);
        let tile = &self.tiles[id.index()];
        let show_replacement = tile.refine == Refine::Replace
            && visibility.contains(ChildrenVisibility::VISIBLE_IN_REQUEST_VOLUME);
        if !(tile.refine == Refine::Additive
            || show_replacement
            || tile.ancestor_with_content.is_none())
        {
            return false;
        }
        if tile.children.is_empty() {
            return false;
        }

        // Replaced content may only disappear once everything that replaces
        // it can be drawn.
        let priority = tile.screen_space_error;
        let additive = tile.refine == Refine::Additive;
        let must_wait = tile.refine == Refine::Replace && tile.has_renderable_content();
        let mut all_ready = true;
        for index in 0..self.tiles[id.index()].children.len() {
            let child = self.tiles[id.index()].children[index];
            // Off-screen additive children add nothing to this frame.
            if additive && !self.tiles[child.index()].visible {
                continue;
            }
            self.request(child, priority, frame);
            self.touch(child, frame, cache);
            if !must_wait {
                continue;
            }
            let ready = if self.tiles[child.index()].has_empty_content() {
                self.descendants_ready(child, view, cache, threshold)
            } else {
                self.tiles[child.index()].content_available()
            };
            all_ready &= ready;
        }

        if !all_ready {
            trace!("{id} keeps its content until its children load");
            *fully_refined = false;
        }
        all_ready
    }

    /// Walk down through tiles without content below `start` and report
    /// whether the first content-bearing tile on every path is available.
    ///
    /// Ignores visibility. Requests and touches every child it passes.
    pub(crate) fn descendants_ready(
        &mut self,
        start: TileId,
        view: &ViewState,
        cache: &mut dyn TileCache,
        threshold: f64,
    ) -> bool {
        let frame = view.frame_number;
        let mut stack = mem::take(&mut self.buffers.probe_stack);
        stack.clear();
        stack.push(start);

        let mut ready = true;
        while let Some(id) = stack.pop() {
            let tile = &self.tiles[id.index()];
            if tile.has_renderable_content() {
                if !tile.content_available() {
                    ready = false;
                    break;
                }
                continue;
            }
            if tile.children.is_empty() || tile.screen_space_error <= threshold {
                continue;
            }

            let priority = tile.screen_space_error;
            self.update_children(id, view);
            for index in 0..self.tiles[id.index()].children.len() {
                let child = self.tiles[id.index()].children[index];
                self.request(child, priority, frame);
                self.touch(child, frame, cache);
                stack.push(child);
            }
        }

        stack.clear();
        self.buffers.probe_stack = stack;
        ready
    }
}
