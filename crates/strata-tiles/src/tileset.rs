//! The tileset: tile arena, traversal configuration and frame outputs.

use glam::{DMat4, DVec3};
use strata_config::TraversalConfig;
use tracing::{debug, warn};

use crate::tile::{Tile, TileDescriptor};
use crate::{
    ContentState, LoadRequest, TileId, TilesetError, TraversalBuffers,
    TraversalStatistics,
};

/// One streamed dataset and the results of its latest tile selection.
#[derive(Debug)]
pub struct Tileset {
    pub(crate) tiles: Vec<Tile>,
    pub(crate) root: TileId,
    /// Error of the whole tileset when drawn as nothing at all.
    pub(crate) geometric_error: Option<f64>,
    pub(crate) root_transform: DMat4,
    pub(crate) up_axis: DVec3,
    pub(crate) config: TraversalConfig,

    pub(crate) desired_tiles: Vec<TileId>,
    pub(crate) selected_tiles: Vec<TileId>,
    pub(crate) requested_tiles: Vec<LoadRequest>,
    pub(crate) selected_tiles_to_style: Vec<TileId>,
    pub(crate) has_mixed_content: bool,
    pub(crate) statistics: TraversalStatistics,
    pub(crate) buffers: TraversalBuffers,
    /// Fog density computed for the current frame.
    pub(crate) dynamic_density: f64,
}

impl Tileset {
    #[must_use]
    pub fn root(&self) -> TileId {
        self.root
    }

    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    /// Every tile id, in insertion order.
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.tiles.len()).map(|index| TileId(index as u32))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn geometric_error(&self) -> Option<f64> {
        self.geometric_error
    }

    #[must_use]
    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Replace the traversal configuration.
    pub fn set_config(&mut self, config: TraversalConfig) -> Result<(), TilesetError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Tiles the traversal wants represented this frame, before fallback.
    #[must_use]
    pub fn desired_tiles(&self) -> &[TileId] {
        &self.desired_tiles
    }

    /// Tiles to render this frame.
    #[must_use]
    pub fn selected_tiles(&self) -> &[TileId] {
        &self.selected_tiles
    }

    /// Content loads requested this frame.
    #[must_use]
    pub fn requested_tiles(&self) -> &[LoadRequest] {
        &self.requested_tiles
    }

    /// Selected tiles whose styling must be (re)applied.
    #[must_use]
    pub fn selected_tiles_to_style(&self) -> &[TileId] {
        &self.selected_tiles_to_style
    }

    /// Whether replace-refined tiles at different depths overlap in this
    /// frame's selection.
    #[must_use]
    pub fn has_mixed_content(&self) -> bool {
        self.has_mixed_content
    }

    #[must_use]
    pub fn statistics(&self) -> &TraversalStatistics {
        &self.statistics
    }

    #[must_use]
    pub fn buffers(&self) -> &TraversalBuffers {
        &self.buffers
    }

    fn tile_mut(&mut self, id: TileId) -> Result<&mut Tile, TilesetError> {
        self.tiles
            .get_mut(id.index())
            .ok_or(TilesetError::UnknownTile(id))
    }

    /// Report a content state transition from the loader.
    ///
    /// Setting content on a tile built without any is rejected silently:
    /// such tiles stay [`ContentState::Empty`].
    pub fn set_content_state(&mut self, id: TileId, state: ContentState) -> Result<(), TilesetError> {
        let tile = self.tile_mut(id)?;
        if tile.content_state == ContentState::Empty {
            return Ok(());
        }
        match state {
            ContentState::Empty => tile.byte_length = 0,
            ContentState::Failed => warn!("Content of {id} failed to load, drawing loaded relatives instead"),
            _ => {}
        }
        tile.content_state = state;
        Ok(())
    }

    /// Flag a tile's content for restyling the next time it is selected.
    pub fn mark_feature_properties_dirty(&mut self, id: TileId) -> Result<(), TilesetError> {
        self.tile_mut(id)?.feature_properties_dirty = true;
        Ok(())
    }

    /// Record when the styling engine last styled a tile.
    pub fn set_last_style_time(&mut self, id: TileId, time: f64) -> Result<(), TilesetError> {
        self.tile_mut(id)?.last_style_time = time;
        Ok(())
    }

    pub(crate) fn clear_frame(&mut self) {
        self.desired_tiles.clear();
        self.selected_tiles.clear();
        self.requested_tiles.clear();
        self.selected_tiles_to_style.clear();
        self.has_mixed_content = false;
        self.statistics.clear();
    }
}

struct PendingTile {
    descriptor: TileDescriptor,
    parent: Option<TileId>,
}

/// Assembles and validates a [`Tileset`].
///
/// Tiles are added parent first; ids are handed out in insertion order.
///
/// ```
/// use glam::DVec3;
/// use strata_cull::BoundingVolume;
/// use strata_tiles::{TileDescriptor, TilesetBuilder};
///
/// let volume = BoundingVolume::aabb(DVec3::splat(-10.0), DVec3::splat(10.0));
/// let mut builder = TilesetBuilder::new();
/// let root = builder.add_root(TileDescriptor::new(volume, 8.0).with_content(1024));
/// builder.add_child(root, TileDescriptor::new(volume, 0.0).with_content(4096));
/// let tileset = builder.build().unwrap();
/// assert_eq!(tileset.len(), 2);
/// ```
pub struct TilesetBuilder {
    pending: Vec<PendingTile>,
    root: Option<TileId>,
    extra_roots: usize,
    geometric_error: Option<f64>,
    root_transform: DMat4,
    up_axis: DVec3,
    config: TraversalConfig,
}

impl Default for TilesetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TilesetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            root: None,
            extra_roots: 0,
            geometric_error: None,
            root_transform: DMat4::IDENTITY,
            up_axis: DVec3::Z,
            config: TraversalConfig::default(),
        }
    }

    /// Error of the tileset as a whole. When the view already meets the
    /// budget at this error nothing is selected.
    #[must_use]
    pub fn geometric_error(mut self, error: f64) -> Self {
        self.geometric_error = Some(error);
        self
    }

    /// Transform applied above the root tile.
    #[must_use]
    pub fn root_transform(mut self, transform: DMat4) -> Self {
        self.root_transform = transform;
        self
    }

    /// World up axis used by the dynamic error model (defaults to +Z).
    #[must_use]
    pub fn up_axis(mut self, up: DVec3) -> Self {
        self.up_axis = up.try_normalize().unwrap_or(DVec3::Z);
        self
    }

    #[must_use]
    pub fn config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    fn next_id(&self) -> TileId {
        TileId(self.pending.len() as u32)
    }

    pub fn add_root(&mut self, descriptor: TileDescriptor) -> TileId {
        let id = self.next_id();
        if self.root.is_some() {
            self.extra_roots += 1;
        } else {
            self.root = Some(id);
        }
        self.pending.push(PendingTile {
            descriptor,
            parent: None,
        });
        id
    }

    pub fn add_child(&mut self, parent: TileId, descriptor: TileDescriptor) -> TileId {
        let id = self.next_id();
        self.pending.push(PendingTile {
            descriptor,
            parent: Some(parent),
        });
        id
    }

    pub fn build(self) -> Result<Tileset, TilesetError> {
        self.config.validate()?;
        let root = self.root.ok_or(TilesetError::MissingRoot)?;
        if self.extra_roots > 0 {
            return Err(TilesetError::MultipleRoots { existing: root });
        }

        let mut tiles: Vec<Tile> = Vec::with_capacity(self.pending.len());
        for (index, pending) in self.pending.into_iter().enumerate() {
            let id = TileId(index as u32);
            let error = pending.descriptor.geometric_error;
            if !(error.is_finite() && error >= 0.0) {
                return Err(TilesetError::InvalidGeometricError { tile: id, error });
            }

            let tile = match pending.parent {
                None => {
                    let refine = pending.descriptor.refine.unwrap_or_default();
                    Tile::new(pending.descriptor, refine, 0, None)
                }
                Some(parent_id) => {
                    // Parents always precede their children, so this also
                    // rules out cycles.
                    let parent = tiles
                        .get_mut(parent_id.index())
                        .ok_or(TilesetError::UnknownParent {
                            tile: id,
                            parent: parent_id,
                        })?;
                    if error > parent.geometric_error {
                        return Err(TilesetError::GeometricErrorIncreases {
                            tile: id,
                            error,
                            parent_error: parent.geometric_error,
                        });
                    }
                    parent.children.push(id);
                    let refine = pending.descriptor.refine.unwrap_or(parent.refine);
                    Tile::new(pending.descriptor, refine, parent.depth + 1, Some(parent_id))
                }
            };
            tiles.push(tile);
        }

        debug!(
            "Built tileset with {} tiles (max depth {})",
            tiles.len(),
            tiles.iter().map(|tile| tile.depth).max().unwrap_or(0)
        );

        Ok(Tileset {
            tiles,
            root,
            geometric_error: self.geometric_error,
            root_transform: self.root_transform,
            up_axis: self.up_axis,
            config: self.config,
            desired_tiles: Vec::new(),
            selected_tiles: Vec::new(),
            requested_tiles: Vec::new(),
            selected_tiles_to_style: Vec::new(),
            has_mixed_content: false,
            statistics: TraversalStatistics::default(),
            buffers: TraversalBuffers::default(),
            dynamic_density: 0.0,
        })
    }
}
