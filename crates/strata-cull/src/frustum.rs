//! View frustum culling with hierarchical plane masks.
//!
//! Planes are extracted from the camera's view-projection matrix. Each tile
//! test is seeded with its parent's [`PlaneMask`]: a parent fully inside a
//! plane means the child is too, so only planes the parent straddles are
//! re-tested.

use glam::{DMat4, DVec4};

use crate::{BoundingVolume, Intersection};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Bit set of frustum planes a volume still straddles.
///
/// A cleared bit means the volume is known to be inside that plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaneMask(u32);

impl PlaneMask {
    /// Fully inside every plane.
    pub const INSIDE: Self = Self(0);
    /// Outside at least one plane.
    pub const OUTSIDE: Self = Self(u32::MAX);
    /// Not tested yet: every plane must be checked.
    pub const INDETERMINATE: Self = Self(0x7fff_ffff);

    /// Raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether the volume may be visible.
    pub fn is_visible(self) -> bool {
        self != Self::OUTSIDE
    }

    /// Collapse the mask into an inside/outside/intersecting classification.
    /// An untested mask reports [`Intersection::Intersecting`].
    pub fn intersection(self) -> Intersection {
        match self {
            Self::INSIDE => Intersection::Inside,
            Self::OUTSIDE => Intersection::Outside,
            _ => Intersection::Intersecting,
        }
    }

    fn tests_plane(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

impl Default for PlaneMask {
    fn default() -> Self {
        Self::INDETERMINATE
    }
}

/// A view frustum defined by six inward-pointing normalized planes.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far.
    /// Each `DVec4(a, b, c, d)` where `(a,b,c)` is the normalized inward
    /// normal and `d` is the signed distance term.
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a reverse-Z view-projection matrix
    /// (near maps to depth 1, far to depth 0) using the Gribb-Hartmann method.
    ///
    /// Works with both perspective and orthographic projections.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // Reverse-Z clip space keeps 0 <= z <= w: depth above w is closer
        // than the near plane, negative depth is beyond the far plane.
        planes[NEAR] = rows[3] - rows[2];
        planes[FAR] = rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 1e-12 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// The six normalized planes.
    pub fn planes(&self) -> &[DVec4; 6] {
        &self.planes
    }

    /// Classify a volume against every plane.
    pub fn intersect(&self, volume: &BoundingVolume) -> Intersection {
        self.compute_visibility(volume, PlaneMask::INDETERMINATE)
            .intersection()
    }

    /// Compute the plane mask of `volume`, skipping planes the parent mask
    /// reports as fully inside.
    ///
    /// An `INSIDE` or `OUTSIDE` parent is returned unchanged without testing.
    pub fn compute_visibility(&self, volume: &BoundingVolume, parent: PlaneMask) -> PlaneMask {
        if parent == PlaneMask::INSIDE || parent == PlaneMask::OUTSIDE {
            return parent;
        }

        let mut mask = PlaneMask::INSIDE;
        for (index, plane) in self.planes.iter().enumerate() {
            if !parent.tests_plane(index) {
                continue;
            }
            match volume.intersect_plane(*plane) {
                Intersection::Outside => return PlaneMask::OUTSIDE,
                Intersection::Intersecting => mask.0 |= 1 << index,
                Intersection::Inside => {}
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Camera;
    use glam::DVec3;

    fn default_frustum() -> Frustum {
        let camera = Camera::looking_at(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        Frustum::from_view_projection(&camera.view_projection_matrix())
    }

    fn aabb(min: [f64; 3], max: [f64; 3]) -> BoundingVolume {
        BoundingVolume::aabb(DVec3::from(min), DVec3::from(max))
    }

    #[test]
    fn test_object_in_front_is_inside() {
        let frustum = default_frustum();
        let volume = aabb([-1.0, -1.0, -50.0], [1.0, 1.0, -30.0]);
        assert_eq!(frustum.intersect(&volume), Intersection::Inside);
    }

    #[test]
    fn test_object_behind_camera_is_outside() {
        let frustum = default_frustum();
        let volume = aabb([-1.0, -1.0, 5.0], [1.0, 1.0, 10.0]);
        assert_eq!(frustum.intersect(&volume), Intersection::Outside);
    }

    #[test]
    fn test_object_straddling_side_plane_intersects() {
        let frustum = default_frustum();
        let volume = aabb([-1000.0, -1.0, -10.0], [1.0, 1.0, -5.0]);
        assert_eq!(frustum.intersect(&volume), Intersection::Intersecting);
    }

    #[test]
    fn test_all_six_planes_tested() {
        let frustum = default_frustum();
        let far = Camera::default().far;
        let cases = [
            aabb([-1000.0, 0.0, -5.0], [-999.0, 1.0, -4.0]),
            aabb([999.0, 0.0, -5.0], [1000.0, 1.0, -4.0]),
            aabb([0.0, 999.0, -5.0], [1.0, 1000.0, -4.0]),
            aabb([0.0, -1000.0, -5.0], [1.0, -999.0, -4.0]),
            aabb([-0.01, -0.01, -0.05], [0.01, 0.01, -0.02]),
            aabb([0.0, 0.0, -far * 2.0], [1.0, 1.0, -far * 1.5]),
        ];
        for volume in cases {
            assert_eq!(frustum.intersect(&volume), Intersection::Outside, "{volume:?}");
        }
    }

    #[test]
    fn test_inside_parent_mask_short_circuits() {
        let frustum = default_frustum();
        // Behind the camera, but the parent claims to be fully inside.
        let volume = aabb([-1.0, -1.0, 5.0], [1.0, 1.0, 10.0]);
        assert_eq!(
            frustum.compute_visibility(&volume, PlaneMask::INSIDE),
            PlaneMask::INSIDE
        );
        assert_eq!(
            frustum.compute_visibility(&volume, PlaneMask::OUTSIDE),
            PlaneMask::OUTSIDE
        );
    }

    #[test]
    fn test_parent_mask_skips_known_inside_planes() {
        let frustum = default_frustum();
        let volume = aabb([-1000.0, -1.0, -10.0], [1.0, 1.0, -5.0]);
        let mask = frustum.compute_visibility(&volume, PlaneMask::INDETERMINATE);
        assert!(mask.tests_plane(LEFT));
        assert!(!mask.tests_plane(RIGHT));

        // A child fully left of the frustum is only rejected if the left
        // plane is still being tested.
        let child = aabb([-1000.0, -1.0, -10.0], [-999.0, 1.0, -5.0]);
        assert_eq!(frustum.compute_visibility(&child, mask), PlaneMask::OUTSIDE);
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in default_frustum().planes() {
            let normal_len = plane.truncate().length();
            assert!((normal_len - 1.0).abs() < 1e-9, "plane normal not normalized: {normal_len}");
        }
    }

    #[test]
    fn test_mask_visibility() {
        assert!(PlaneMask::INSIDE.is_visible());
        assert!(PlaneMask::INDETERMINATE.is_visible());
        assert!(!PlaneMask::OUTSIDE.is_visible());
        assert_eq!(PlaneMask::default(), PlaneMask::INDETERMINATE);
    }
}
