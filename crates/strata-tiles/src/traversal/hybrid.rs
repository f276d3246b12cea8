//! Base refinement to a coarse threshold, then level skipping below it.

use std::mem;

use tracing::trace;

use super::BaseMode;
use crate::{TileCache, Tileset, ViewState};

impl Tileset {
    pub(crate) fn execute_hybrid_traversal(&mut self, view: &ViewState, cache: &mut dyn TileCache) {
        let threshold = self
            .config
            .base_screen_space_error
            .max(self.config.maximum_screen_space_error);
        let fully_refined = self.execute_base_traversal(view, cache, threshold, BaseMode::Hybrid);
        self.statistics.base_fully_refined = fully_refined;
        if !fully_refined {
            trace!("Base pass stopped above {threshold:.1} px, skipping from its leaves");
        }

        let seeds = mem::take(&mut self.buffers.leaves);
        self.execute_skip_traversal(view, cache, &seeds);
        self.buffers.leaves = seeds;
    }
}
