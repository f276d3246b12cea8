//! Camera, bounding volumes and frustum culling in double-precision space.
//!
//! Culling is hierarchical: [`Frustum::compute_visibility`] takes the parent's
//! [`PlaneMask`] so planes a parent is already fully inside are never tested
//! again for its children.

mod camera;
mod frustum;
mod volume;

pub use camera::{Camera, Projection};
pub use frustum::{Frustum, PlaneMask};
pub use volume::{BoundingSphere, BoundingVolume, OrientedBox};

/// Result of testing a volume against a plane or the whole frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// The volume is entirely inside.
    Inside,
    /// The volume is entirely outside.
    Outside,
    /// The volume straddles one or more planes.
    Intersecting,
}
