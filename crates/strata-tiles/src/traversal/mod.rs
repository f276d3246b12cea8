//! Frame entry point and the bookkeeping shared by all traversal strategies.

mod base;
mod hybrid;
mod skip;

use tracing::{debug, trace};

use crate::sse::dynamic_density;
use crate::{LoadRequest, Refine, TileCache, TileId, Tileset, ViewState};

pub(crate) use base::BaseMode;

impl Tileset {
    /// Select the tiles to render for one frame.
    ///
    /// Fills [`desired_tiles`](Self::desired_tiles),
    /// [`selected_tiles`](Self::selected_tiles),
    /// [`requested_tiles`](Self::requested_tiles) and
    /// [`selected_tiles_to_style`](Self::selected_tiles_to_style), and reports
    /// recency to `cache`. Never blocks on content: tiles that are not loaded
    /// yet are requested and stood in for by loaded relatives.
    pub fn select_tiles(&mut self, view: &ViewState, cache: &mut dyn TileCache) {
        if self.config.debug_freeze_frame {
            trace!("Frame {} frozen, keeping previous selection", view.frame_number);
            return;
        }

        self.clear_frame();
        cache.reset();

        self.dynamic_density = if self.config.dynamic_screen_space_error {
            let root = &self.tiles[self.root.index()];
            let root_volume = root
                .bounding_volume
                .transform(&(self.root_transform * root.transform));
            dynamic_density(&self.config, &view.camera, &root_volume, self.up_axis)
        } else {
            0.0
        };

        let root = self.root;
        self.update_tile(root, view);
        if !self.root_needs_traversal(view) {
            return;
        }

        let frame = view.frame_number;
        let root_error = self.tiles[root.index()].screen_space_error;
        self.request(root, root_error, frame);
        self.touch(root, frame, cache);

        if !self.config.skip_level_of_detail {
            let threshold = self.config.maximum_screen_space_error;
            let fully_refined = self.execute_base_traversal(view, cache, threshold, BaseMode::Plain);
            self.statistics.base_fully_refined = fully_refined;
        } else if self.config.immediately_load_desired_level_of_detail {
            self.execute_skip_traversal(view, cache, &[root]);
        } else {
            self.execute_hybrid_traversal(view, cache);
        }

        self.mark_loaded_tiles_for_selection(view, cache);
        self.traverse_and_select(view);
        self.buffers.trim();

        self.statistics.selected = self.selected_tiles.len() as u32;
        debug!("Frame {frame}: {}", self.statistics);
    }

    /// Whether anything below the root can contribute this frame.
    fn root_needs_traversal(&self, view: &ViewState) -> bool {
        let root = &self.tiles[self.root.index()];
        if let Some(error) = self.geometric_error {
            let tileset_error = self.error_at(error, root.distance_to_camera, view);
            if tileset_error <= self.config.maximum_screen_space_error {
                trace!("Tileset error {tileset_error:.2} within budget, nothing to draw");
                return false;
            }
        }
        if !root.in_request_volume {
            trace!("Viewer outside the root request volume");
            return false;
        }
        if !root.visible {
            trace!("Root tile culled");
            return false;
        }
        true
    }

    /// Stamp a tile as visited and reset the state selection derives from it.
    ///
    /// Ancestor links only pass through replace-refined parents: an additive
    /// parent is drawn anyway and can never stand in for its children.
    pub(crate) fn visit_tile(&mut self, id: TileId, frame: u64) {
        let (ancestor_with_content, ancestor_with_content_available) =
            match self.tiles[id.index()].parent {
                None => (None, None),
                Some(parent_id) => {
                    let parent = &self.tiles[parent_id.index()];
                    match parent.refine {
                        Refine::Additive => (
                            parent.ancestor_with_content,
                            parent.ancestor_with_content_available,
                        ),
                        Refine::Replace => {
                            let has_content = !parent.has_unloaded_renderable_content()
                                || parent.requested_frame == frame;
                            (
                                if has_content {
                                    Some(parent_id)
                                } else {
                                    parent.ancestor_with_content
                                },
                                if parent.content_available() {
                                    Some(parent_id)
                                } else {
                                    parent.ancestor_with_content_available
                                },
                            )
                        }
                    }
                }
            };

        let tile = &mut self.tiles[id.index()];
        if tile.visited_frame != frame {
            tile.visited_frame = frame;
            self.statistics.visited += 1;
        }
        tile.selected = false;
        tile.final_resolution = true;
        tile.selection_depth = 0;
        tile.ancestor_with_content = ancestor_with_content;
        tile.ancestor_with_content_available = ancestor_with_content_available;
    }

    /// Forward a touch to the cache, once per tile per frame.
    pub(crate) fn touch(&mut self, id: TileId, frame: u64, cache: &mut dyn TileCache) {
        let tile = &mut self.tiles[id.index()];
        if tile.touched_frame == frame {
            return;
        }
        tile.touched_frame = frame;
        cache.touch(id);
    }

    /// Ask the loader for a tile's content if it is missing or stale.
    pub(crate) fn request(&mut self, id: TileId, priority: f64, frame: u64) {
        let tile = &mut self.tiles[id.index()];
        if tile.requested_frame == frame || !tile.needs_request() {
            return;
        }
        tile.requested_frame = frame;
        self.requested_tiles.push(LoadRequest { tile: id, priority });
        self.statistics.requested += 1;
    }

    /// Add a tile to this frame's desired set.
    pub(crate) fn desire(&mut self, id: TileId, frame: u64) {
        let tile = &mut self.tiles[id.index()];
        if tile.desired_frame == frame {
            return;
        }
        tile.desired_frame = frame;
        self.desired_tiles.push(id);
        self.statistics.desired += 1;
    }
}
