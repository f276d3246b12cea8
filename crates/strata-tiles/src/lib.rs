//! Per-frame level-of-detail tile selection for streamed hierarchical tilesets.
//!
//! A [`Tileset`] owns an arena of [`Tile`]s. Every frame the host calls
//! [`Tileset::select_tiles`] with the current [`ViewState`] and a [`TileCache`];
//! the tileset then exposes the tiles to render, the tiles it wants loaded,
//! and the tiles whose styling must be refreshed.
//!
//! Three strategies are available: plain depth-first refinement, breadth-first
//! level skipping, and a hybrid that refines to a coarse threshold before
//! skipping. Loading never blocks selection: missing content degrades to the
//! nearest loaded ancestor or to nearby loaded descendants.

mod buffers;
mod cache;
mod error;
mod request;
mod selection;
mod sse;
mod statistics;
mod tile;
mod tileset;
mod traversal;
mod update;
mod view;

pub use buffers::TraversalBuffers;
pub use cache::{LruTileCache, TileCache};
pub use error::TilesetError;
pub use request::{LoadRequest, RequestQueue};
pub use sse::{DynamicError, dynamic_density, fog, screen_space_error};
pub use statistics::TraversalStatistics;
pub use tile::{ChildrenVisibility, ContentState, Refine, Tile, TileDescriptor, TileId};
pub use tileset::{Tileset, TilesetBuilder};
pub use view::{ViewState, Viewport};
