//! Tile arena nodes: static tree attributes plus the per-frame state the
//! traversal derives from the view.

use std::fmt;

use bitflags::bitflags;
use glam::DMat4;
use strata_cull::{BoundingVolume, PlaneMask};

/// Frame stamp for "never happened".
pub(crate) const NEVER: u64 = u64::MAX;

/// Index of a tile in its tileset's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) u32);

impl TileId {
    /// Arena index of this tile.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// How a tile's children relate to its own content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Refine {
    /// Children are drawn on top of the parent's content.
    Additive,
    /// Children supersede the parent's content.
    #[default]
    Replace,
}

/// Lifecycle of a tile's content as reported by the external loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentState {
    /// Not requested yet, or evicted.
    Unloaded,
    /// A request is in flight.
    Loading,
    /// Ready to render.
    Available,
    /// Stale; must be requested again before it can be rendered.
    Expired,
    /// Loading failed and will not be retried.
    Failed,
    /// The tile has no content at all.
    Empty,
}

bitflags! {
    /// Summary of the visibility of a tile's children, returned by the
    /// children update.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ChildrenVisibility: u8 {
        /// At least one child is visible.
        const VISIBLE = 1 << 0;
        /// At least one child is visible and contains the viewer in its request volume.
        const VISIBLE_IN_REQUEST_VOLUME = 1 << 1;
        /// At least one child is in the frustum but the viewer is outside its request volume.
        const VISIBLE_NOT_IN_REQUEST_VOLUME = 1 << 2;
        /// At least one child contains the viewer in its request volume.
        const IN_REQUEST_VOLUME = 1 << 3;
    }
}

/// Static description of a tile, handed to [`TilesetBuilder`](crate::TilesetBuilder).
#[derive(Clone, Debug)]
pub struct TileDescriptor {
    /// Bounding volume in the tile's local frame.
    pub bounding_volume: BoundingVolume,
    /// Geometric error in world units.
    pub geometric_error: f64,
    /// Refinement mode; `None` inherits the parent's (root defaults to replace).
    pub refine: Option<Refine>,
    /// Transform from the tile's frame to its parent's.
    pub transform: DMat4,
    /// Content size in bytes, or `None` for a tile without content.
    pub content_byte_length: Option<u64>,
    /// Tighter volume around the content, in the tile's local frame.
    pub content_bounding_volume: Option<BoundingVolume>,
    /// The tile is only shown while the viewer is inside this volume.
    pub viewer_request_volume: Option<BoundingVolume>,
}

impl TileDescriptor {
    /// An empty tile with an identity transform.
    pub fn new(bounding_volume: BoundingVolume, geometric_error: f64) -> Self {
        Self {
            bounding_volume,
            geometric_error,
            refine: None,
            transform: DMat4::IDENTITY,
            content_byte_length: None,
            content_bounding_volume: None,
            viewer_request_volume: None,
        }
    }

    /// Set the refinement explicitly instead of inheriting the parent's.
    #[must_use]
    pub fn with_refine(mut self, refine: Refine) -> Self {
        self.refine = Some(refine);
        self
    }

    /// Give the tile renderable content of `byte_length` bytes.
    #[must_use]
    pub fn with_content(mut self, byte_length: u64) -> Self {
        self.content_byte_length = Some(byte_length);
        self
    }

    /// Set the transform relative to the parent tile.
    #[must_use]
    pub fn with_transform(mut self, transform: DMat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set a tighter volume around the content, used for the final
    /// visibility check.
    #[must_use]
    pub fn with_content_bounding_volume(mut self, volume: BoundingVolume) -> Self {
        self.content_bounding_volume = Some(volume);
        self
    }

    /// Only refine or draw the tile while the viewer is inside `volume`.
    #[must_use]
    pub fn with_viewer_request_volume(mut self, volume: BoundingVolume) -> Self {
        self.viewer_request_volume = Some(volume);
        self
    }
}

/// A node of the tileset tree.
#[derive(Clone, Debug)]
pub struct Tile {
    // --- static ---
    pub(crate) geometric_error: f64,
    pub(crate) refine: Refine,
    pub(crate) transform: DMat4,
    pub(crate) bounding_volume: BoundingVolume,
    pub(crate) content_bounding_volume: Option<BoundingVolume>,
    pub(crate) viewer_request_volume: Option<BoundingVolume>,
    pub(crate) depth: u32,
    pub(crate) parent: Option<TileId>,
    pub(crate) children: Vec<TileId>,

    // --- content ---
    pub(crate) content_state: ContentState,
    pub(crate) byte_length: u64,
    pub(crate) feature_properties_dirty: bool,
    pub(crate) last_style_time: f64,

    // --- derived per frame ---
    pub(crate) computed_transform: DMat4,
    pub(crate) world_bounding_volume: BoundingVolume,
    pub(crate) distance_to_camera: f64,
    pub(crate) center_z_depth: f64,
    pub(crate) screen_space_error: f64,
    pub(crate) plane_mask: PlaneMask,
    pub(crate) in_request_volume: bool,
    pub(crate) visible: bool,
    pub(crate) children_visibility: ChildrenVisibility,

    // --- frame stamps ---
    pub(crate) visibility_frame: u64,
    pub(crate) updated_frame: u64,
    pub(crate) visited_frame: u64,
    pub(crate) touched_frame: u64,
    pub(crate) requested_frame: u64,
    pub(crate) desired_frame: u64,
    pub(crate) selected_frame: u64,

    // --- selection ---
    pub(crate) selected: bool,
    pub(crate) final_resolution: bool,
    pub(crate) selection_depth: usize,
    pub(crate) stack_length: usize,
    pub(crate) ancestor_with_content: Option<TileId>,
    pub(crate) ancestor_with_content_available: Option<TileId>,
}

impl Tile {
    pub(crate) fn new(
        descriptor: TileDescriptor,
        refine: Refine,
        depth: u32,
        parent: Option<TileId>,
    ) -> Self {
        let content_state = match descriptor.content_byte_length {
            Some(_) => ContentState::Unloaded,
            None => ContentState::Empty,
        };
        Self {
            geometric_error: descriptor.geometric_error,
            refine,
            transform: descriptor.transform,
            bounding_volume: descriptor.bounding_volume,
            content_bounding_volume: descriptor.content_bounding_volume,
            viewer_request_volume: descriptor.viewer_request_volume,
            depth,
            parent,
            children: Vec::new(),
            content_state,
            byte_length: descriptor.content_byte_length.unwrap_or(0),
            feature_properties_dirty: false,
            last_style_time: 0.0,
            computed_transform: descriptor.transform,
            world_bounding_volume: descriptor.bounding_volume,
            distance_to_camera: f64::MAX,
            center_z_depth: f64::MAX,
            screen_space_error: 0.0,
            plane_mask: PlaneMask::INDETERMINATE,
            in_request_volume: true,
            visible: false,
            children_visibility: ChildrenVisibility::empty(),
            visibility_frame: NEVER,
            updated_frame: NEVER,
            visited_frame: NEVER,
            touched_frame: NEVER,
            requested_frame: NEVER,
            desired_frame: NEVER,
            selected_frame: NEVER,
            selected: false,
            final_resolution: true,
            selection_depth: 0,
            stack_length: 0,
            ancestor_with_content: None,
            ancestor_with_content_available: None,
        }
    }

    #[must_use]
    pub fn geometric_error(&self) -> f64 {
        self.geometric_error
    }

    #[must_use]
    pub fn refine(&self) -> Refine {
        self.refine
    }

    /// Number of edges between this tile and the root.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[TileId] {
        &self.children
    }

    #[must_use]
    pub fn content_state(&self) -> ContentState {
        self.content_state
    }

    /// Size of the content in bytes (0 for tiles without content).
    #[must_use]
    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    #[must_use]
    pub fn feature_properties_dirty(&self) -> bool {
        self.feature_properties_dirty
    }

    /// Time the content was last styled; reset to 0 when the feature
    /// properties changed.
    #[must_use]
    pub fn last_style_time(&self) -> f64 {
        self.last_style_time
    }

    /// Whether the tile declares content at all.
    #[must_use]
    pub fn has_renderable_content(&self) -> bool {
        self.content_state != ContentState::Empty
    }

    #[must_use]
    pub fn has_empty_content(&self) -> bool {
        self.content_state == ContentState::Empty
    }

    /// Whether the content is ready to render.
    #[must_use]
    pub fn content_available(&self) -> bool {
        self.content_state == ContentState::Available
    }

    #[must_use]
    pub fn content_unloaded(&self) -> bool {
        self.content_state == ContentState::Unloaded
    }

    pub(crate) fn has_unloaded_renderable_content(&self) -> bool {
        self.has_renderable_content() && self.content_unloaded()
    }

    /// Whether the loader should be asked for this tile's content.
    pub(crate) fn needs_request(&self) -> bool {
        matches!(
            self.content_state,
            ContentState::Unloaded | ContentState::Expired
        )
    }

    /// Transform from the tile's frame to world space, as of the last update.
    #[must_use]
    pub fn computed_transform(&self) -> &DMat4 {
        &self.computed_transform
    }

    #[must_use]
    pub fn world_bounding_volume(&self) -> &BoundingVolume {
        &self.world_bounding_volume
    }

    /// Distance from the viewer to the bounding volume (0 when inside).
    #[must_use]
    pub fn distance_to_camera(&self) -> f64 {
        self.distance_to_camera
    }

    /// Depth of the volume center along the camera's forward axis.
    #[must_use]
    pub fn center_z_depth(&self) -> f64 {
        self.center_z_depth
    }

    #[must_use]
    pub fn screen_space_error(&self) -> f64 {
        self.screen_space_error
    }

    #[must_use]
    pub fn plane_mask(&self) -> PlaneMask {
        self.plane_mask
    }

    #[must_use]
    pub fn in_request_volume(&self) -> bool {
        self.in_request_volume
    }

    /// Visible for the current frame: inside the frustum and the viewer
    /// request volume, and not culled by an optimization.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn children_visibility(&self) -> ChildrenVisibility {
        self.children_visibility
    }

    /// Whether the tile was visited by the traversal in `frame`.
    #[must_use]
    pub fn visited_in(&self, frame: u64) -> bool {
        self.visited_frame == frame
    }

    /// Whether the tile was committed to the render list in `frame`.
    #[must_use]
    pub fn selected_in(&self, frame: u64) -> bool {
        self.selected_frame == frame
    }

    /// False when the tile was committed only as a placeholder for
    /// descendants that are still loading.
    #[must_use]
    pub fn final_resolution(&self) -> bool {
        self.final_resolution
    }

    /// Number of selected replace-refined ancestors drawn beneath this tile.
    #[must_use]
    pub fn selection_depth(&self) -> usize {
        self.selection_depth
    }

    /// Nearest replace-refined ancestor that has, or is about to request, content.
    #[must_use]
    pub fn ancestor_with_content(&self) -> Option<TileId> {
        self.ancestor_with_content
    }

    /// Nearest replace-refined ancestor whose content is available.
    #[must_use]
    pub fn ancestor_with_content_available(&self) -> Option<TileId> {
        self.ancestor_with_content_available
    }
}
