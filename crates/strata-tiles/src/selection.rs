//! Turning the desired set into the committed render list.
//!
//! Desired tiles whose content is missing are stood in for by their nearest
//! loaded ancestor, or failing that by loaded descendants close below them.
//! The final walk commits selected tiles nearest first and records where
//! replace-refined tiles overlap.

use std::mem;

use strata_cull::{Intersection, PlaneMask};

use crate::{Refine, TileCache, TileId, Tileset, ViewState};

/// How far below a desired tile the descendant fallback looks.
const DESCENDANT_SELECTION_DEPTH: u32 = 2;

impl Tileset {
    /// Mark, for every desired tile, the loaded tile that represents it.
    pub(crate) fn mark_loaded_tiles_for_selection(
        &mut self,
        view: &ViewState,
        cache: &mut dyn TileCache,
    ) {
        let desired = mem::take(&mut self.desired_tiles);
        for &id in &desired {
            let tile = &self.tiles[id.index()];
            let loaded = if tile.content_available() {
                Some(id)
            } else {
                tile.ancestor_with_content_available
            };
            match loaded {
                Some(loaded) => self.tiles[loaded.index()].selected = true,
                None => self.select_descendants(id, view, cache),
            }
        }
        self.desired_tiles = desired;
    }

    /// Commit loaded descendants of `root` a few levels down, continuing only
    /// below children that cannot be drawn themselves or draw additively.
    fn select_descendants(&mut self, root: TileId, view: &ViewState, cache: &mut dyn TileCache) {
        let frame = view.frame_number;
        let root_depth = self.tiles[root.index()].depth;
        let mut stack = mem::take(&mut self.buffers.descendant_stack);
        stack.clear();
        stack.push(root);

        while let Some(id) = stack.pop() {
            for index in 0..self.tiles[id.index()].children.len() {
                let child = self.tiles[id.index()].children[index];
                self.update_tile(child, view);
                let tile = &self.tiles[child.index()];
                if !tile.visible {
                    continue;
                }
                let available = tile.content_available();
                let descend = (!available || tile.refine == Refine::Additive)
                    && tile.depth - root_depth < DESCENDANT_SELECTION_DEPTH;

                self.touch(child, frame, cache);
                if available {
                    self.tiles[child.index()].final_resolution = true;
                    self.select_tile(child, view);
                }
                if descend {
                    stack.push(child);
                }
            }
        }

        self.buffers.descendant_stack = stack;
    }

    /// Walk the visited tiles from the root and commit the selected ones.
    ///
    /// Children are pushed farthest first so the nearest is committed first.
    /// A selected replace-refined tile with visited children waits on the
    /// ancestor stack until its subtree is done; anything selected inside
    /// that subtree raises [`has_mixed_content`](Self::has_mixed_content).
    pub(crate) fn traverse_and_select(&mut self, view: &ViewState) {
        let frame = view.frame_number;
        let mut stack = mem::take(&mut self.buffers.selection_stack);
        let mut ancestors = mem::take(&mut self.buffers.ancestor_stack);
        let mut children = mem::take(&mut self.buffers.child_scratch);
        stack.clear();
        ancestors.clear();
        stack.push(self.root);
        let mut last_ancestor: Option<TileId> = None;

        while !stack.is_empty() || !ancestors.is_empty() {
            if let Some(&waiting) = ancestors.last()
                && self.tiles[waiting.index()].stack_length == stack.len()
            {
                ancestors.pop();
                if last_ancestor != Some(waiting) {
                    self.tiles[waiting.index()].final_resolution = false;
                }
                self.select_tile(waiting, view);
                continue;
            }

            let Some(id) = stack.pop() else {
                break;
            };
            let tile = &self.tiles[id.index()];
            if tile.visited_frame != frame {
                continue;
            }
            let traverse = !tile.children.is_empty();

            if tile.selected {
                if tile.refine == Refine::Additive {
                    self.select_tile(id, view);
                } else {
                    let depth = ancestors.len();
                    let tile = &mut self.tiles[id.index()];
                    tile.selection_depth = depth;
                    if depth > 0 {
                        self.has_mixed_content = true;
                    }
                    last_ancestor = Some(id);
                    if !traverse {
                        self.select_tile(id, view);
                        continue;
                    }
                    tile.stack_length = stack.len();
                    ancestors.push(id);
                }
            }

            if traverse {
                children.clear();
                children.extend(
                    self.tiles[id.index()]
                        .children
                        .iter()
                        .copied()
                        .filter(|child| self.tiles[child.index()].visited_frame == frame),
                );
                let tiles = &self.tiles;
                children.sort_by(|a, b| {
                    let (a, b) = (&tiles[a.index()], &tiles[b.index()]);
                    b.distance_to_camera
                        .total_cmp(&a.distance_to_camera)
                        .then_with(|| b.center_z_depth.total_cmp(&a.center_z_depth))
                });
                stack.extend_from_slice(&children);
            }
        }

        children.clear();
        self.buffers.selection_stack = stack;
        self.buffers.ancestor_stack = ancestors;
        self.buffers.child_scratch = children;
    }

    /// Classify the content against the frustum, using the tighter content
    /// volume when the tile declares one.
    fn content_visibility(&self, id: TileId, view: &ViewState) -> Intersection {
        let tile = &self.tiles[id.index()];
        if tile.plane_mask == PlaneMask::INSIDE {
            return Intersection::Inside;
        }
        match tile.content_bounding_volume {
            Some(volume) => view
                .frustum
                .compute_visibility(&volume.transform(&tile.computed_transform), tile.plane_mask)
                .intersection(),
            None => tile.plane_mask.intersection(),
        }
    }

    /// Commit a tile to this frame's render list.
    pub(crate) fn select_tile(&mut self, id: TileId, view: &ViewState) {
        let frame = view.frame_number;
        let tile = &self.tiles[id.index()];
        debug_assert!(
            tile.content_available(),
            "{id} selected without available content"
        );
        if tile.selected_frame == frame || !tile.content_available() {
            return;
        }
        if self.content_visibility(id, view) == Intersection::Outside {
            return;
        }

        let tile = &mut self.tiles[id.index()];
        if tile.feature_properties_dirty {
            tile.feature_properties_dirty = false;
            tile.last_style_time = 0.0;
            self.selected_tiles_to_style.push(id);
        } else if frame == 0 || tile.selected_frame != frame - 1 {
            // Newly selected: style it before its first draw.
            self.selected_tiles_to_style.push(id);
        }
        tile.selected_frame = frame;
        self.selected_tiles.push(id);
    }
}
