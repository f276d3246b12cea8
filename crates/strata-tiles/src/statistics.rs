//! Per-frame traversal counters.

use std::fmt;

/// Counters reset at the start of every [`Tileset::select_tiles`](crate::Tileset::select_tiles) call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraversalStatistics {
    /// Tiles visited by any traversal pass.
    pub visited: u32,
    /// Tiles found invisible while updating.
    pub culled: u32,
    /// Replace-refined tiles culled because none of their children were visible.
    pub culled_with_children_union: u32,
    /// Load requests issued.
    pub requested: u32,
    /// Tiles added to the desired set.
    pub desired: u32,
    /// Tiles committed to the render list.
    pub selected: u32,
    /// Whether the base pass refined every visible tile it wanted to.
    pub base_fully_refined: bool,
}

impl TraversalStatistics {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for TraversalStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited={} culled={} culled_union={} requested={} desired={} selected={}",
            self.visited,
            self.culled,
            self.culled_with_children_union,
            self.requested,
            self.desired,
            self.selected
        )
    }
}
