use strata_config::ConfigError;
use thiserror::Error;

use crate::TileId;

/// Errors raised while building or mutating a tileset.
#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("tileset has no root tile")]
    MissingRoot,

    #[error("tileset already has a root tile ({existing})")]
    MultipleRoots { existing: TileId },

    #[error("{tile} refers to unknown parent {parent}")]
    UnknownParent { tile: TileId, parent: TileId },

    #[error("{0} does not exist in this tileset")]
    UnknownTile(TileId),

    #[error("{tile} has invalid geometric error {error}")]
    InvalidGeometricError { tile: TileId, error: f64 },

    #[error("{tile} has geometric error {error}, larger than its parent's {parent_error}")]
    GeometricErrorIncreases {
        tile: TileId,
        error: f64,
        parent_error: f64,
    },

    #[error("invalid traversal configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
