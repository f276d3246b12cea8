//! Bounding volumes used by tiles and viewer request regions.

use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::Intersection;

/// A bounding sphere in f64 space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere.
    pub center: DVec3,
    /// Radius of the sphere.
    pub radius: f64,
}

/// An oriented bounding box: a center plus three half-axis vectors stored as
/// the columns of `half_axes`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedBox {
    /// Center of the box.
    pub center: DVec3,
    /// Columns are the box half-axes (direction and half-length).
    pub half_axes: DMat3,
}

/// Closed set of bounding volume shapes a tile may declare.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundingVolume {
    /// Sphere volume.
    Sphere(BoundingSphere),
    /// Oriented box volume.
    Box(OrientedBox),
}

impl BoundingSphere {
    /// Create a new sphere.
    pub fn new(center: DVec3, radius: f64) -> Self {
        debug_assert!(radius >= 0.0, "sphere radius must be non-negative");
        Self { center, radius }
    }

    fn intersect_plane(&self, plane: DVec4) -> Intersection {
        let distance = plane.truncate().dot(self.center) + plane.w;
        if distance < -self.radius {
            Intersection::Outside
        } else if distance < self.radius {
            Intersection::Intersecting
        } else {
            Intersection::Inside
        }
    }

    fn distance_squared_to(&self, point: DVec3) -> f64 {
        let d = (self.center.distance(point) - self.radius).max(0.0);
        d * d
    }

    fn transform(&self, matrix: &DMat4) -> Self {
        let scale = matrix
            .x_axis
            .truncate()
            .length()
            .max(matrix.y_axis.truncate().length())
            .max(matrix.z_axis.truncate().length());
        Self {
            center: matrix.transform_point3(self.center),
            radius: self.radius * scale,
        }
    }
}

impl OrientedBox {
    /// Create a box from its center and half-axes.
    pub fn new(center: DVec3, half_axes: DMat3) -> Self {
        Self { center, half_axes }
    }

    /// Create an axis-aligned box from min and max corners.
    pub fn from_min_max(min: DVec3, max: DVec3) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "box min must be <= max on all axes"
        );
        let half = (max - min) * 0.5;
        Self {
            center: (min + max) * 0.5,
            half_axes: DMat3::from_diagonal(half),
        }
    }

    fn axes(&self) -> [DVec3; 3] {
        [self.half_axes.x_axis, self.half_axes.y_axis, self.half_axes.z_axis]
    }

    fn intersect_plane(&self, plane: DVec4) -> Intersection {
        let normal = plane.truncate();
        // Projection of the half-axes onto the plane normal.
        let radius: f64 = self.axes().iter().map(|axis| axis.dot(normal).abs()).sum();
        let distance = normal.dot(self.center) + plane.w;
        if distance <= -radius {
            Intersection::Outside
        } else if distance < radius {
            Intersection::Intersecting
        } else {
            Intersection::Inside
        }
    }

    fn distance_squared_to(&self, point: DVec3) -> f64 {
        let offset = point - self.center;
        let mut result = 0.0;
        for axis in self.axes() {
            let half_length = axis.length();
            if half_length <= 0.0 {
                continue;
            }
            let d = offset.dot(axis / half_length);
            if d < -half_length {
                result += (d + half_length) * (d + half_length);
            } else if d > half_length {
                result += (d - half_length) * (d - half_length);
            }
        }
        result
    }

    fn transform(&self, matrix: &DMat4) -> Self {
        Self {
            center: matrix.transform_point3(self.center),
            half_axes: DMat3::from_mat4(*matrix) * self.half_axes,
        }
    }
}

impl BoundingVolume {
    /// Axis-aligned box volume from min and max corners.
    pub fn aabb(min: DVec3, max: DVec3) -> Self {
        Self::Box(OrientedBox::from_min_max(min, max))
    }

    /// Sphere volume.
    pub fn sphere(center: DVec3, radius: f64) -> Self {
        Self::Sphere(BoundingSphere::new(center, radius))
    }

    /// Center of the volume.
    pub fn center(&self) -> DVec3 {
        match self {
            Self::Sphere(sphere) => sphere.center,
            Self::Box(obb) => obb.center,
        }
    }

    /// Classify the volume against a normalized plane `(normal, d)` whose
    /// positive half-space is "inside".
    pub fn intersect_plane(&self, plane: DVec4) -> Intersection {
        match self {
            Self::Sphere(sphere) => sphere.intersect_plane(plane),
            Self::Box(obb) => obb.intersect_plane(plane),
        }
    }

    /// Squared distance from `point` to the closest point of the volume
    /// (zero when the point is inside).
    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        match self {
            Self::Sphere(sphere) => sphere.distance_squared_to(point),
            Self::Box(obb) => obb.distance_squared_to(point),
        }
    }

    /// Distance from `point` to the volume (zero when inside).
    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.distance_squared_to(point).sqrt()
    }

    /// Whether `point` lies inside or on the boundary of the volume.
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.distance_squared_to(point) == 0.0
    }

    /// Volume transformed into another frame.
    pub fn transform(&self, matrix: &DMat4) -> Self {
        match self {
            Self::Sphere(sphere) => Self::Sphere(sphere.transform(matrix)),
            Self::Box(obb) => Self::Box(obb.transform(matrix)),
        }
    }

    /// Lowest and highest extent of the volume along a unit direction.
    pub fn extent_along(&self, direction: DVec3) -> (f64, f64) {
        let center = self.center().dot(direction);
        let radius = match self {
            Self::Sphere(sphere) => sphere.radius,
            Self::Box(obb) => obb.axes().iter().map(|axis| axis.dot(direction).abs()).sum(),
        };
        (center - radius, center + radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingVolume {
        BoundingVolume::aabb(DVec3::splat(-1.0), DVec3::splat(1.0))
    }

    #[test]
    fn test_box_plane_classification() {
        let volume = unit_box();
        // Plane x >= -5: box entirely on the positive side.
        assert_eq!(
            volume.intersect_plane(DVec4::new(1.0, 0.0, 0.0, 5.0)),
            Intersection::Inside
        );
        // Plane x >= 5: box entirely behind.
        assert_eq!(
            volume.intersect_plane(DVec4::new(1.0, 0.0, 0.0, -5.0)),
            Intersection::Outside
        );
        // Plane x >= 0 cuts the box.
        assert_eq!(
            volume.intersect_plane(DVec4::new(1.0, 0.0, 0.0, 0.0)),
            Intersection::Intersecting
        );
    }

    #[test]
    fn test_sphere_plane_classification() {
        let volume = BoundingVolume::sphere(DVec3::ZERO, 2.0);
        assert_eq!(
            volume.intersect_plane(DVec4::new(0.0, 1.0, 0.0, 3.0)),
            Intersection::Inside
        );
        assert_eq!(
            volume.intersect_plane(DVec4::new(0.0, 1.0, 0.0, -3.0)),
            Intersection::Outside
        );
        assert_eq!(
            volume.intersect_plane(DVec4::new(0.0, 1.0, 0.0, 1.0)),
            Intersection::Intersecting
        );
    }

    #[test]
    fn test_distance_is_zero_inside() {
        assert_eq!(unit_box().distance_to(DVec3::new(0.5, 0.0, -0.5)), 0.0);
        assert_eq!(
            BoundingVolume::sphere(DVec3::ZERO, 1.0).distance_to(DVec3::ZERO),
            0.0
        );
    }

    #[test]
    fn test_distance_to_box_face_and_corner() {
        let volume = unit_box();
        assert!((volume.distance_to(DVec3::new(4.0, 0.0, 0.0)) - 3.0).abs() < 1e-12);
        let corner = volume.distance_to(DVec3::new(2.0, 2.0, 2.0));
        assert!((corner - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_sphere() {
        let volume = BoundingVolume::sphere(DVec3::new(10.0, 0.0, 0.0), 2.0);
        assert!((volume.distance_to(DVec3::ZERO) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_contains_point() {
        let volume = unit_box();
        assert!(volume.contains_point(DVec3::ZERO));
        assert!(volume.contains_point(DVec3::splat(1.0)));
        assert!(!volume.contains_point(DVec3::splat(1.5)));
    }

    #[test]
    fn test_transform_translates_and_scales() {
        let matrix = DMat4::from_scale_rotation_translation(
            DVec3::splat(2.0),
            glam::DQuat::IDENTITY,
            DVec3::new(10.0, 0.0, 0.0),
        );
        let sphere = BoundingVolume::sphere(DVec3::ZERO, 1.0).transform(&matrix);
        assert_eq!(sphere, BoundingVolume::sphere(DVec3::new(10.0, 0.0, 0.0), 2.0));

        let obb = unit_box().transform(&matrix);
        assert_eq!(obb.center(), DVec3::new(10.0, 0.0, 0.0));
        assert!((obb.distance_to(DVec3::new(13.0, 0.0, 0.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extent_along_axis() {
        let volume = BoundingVolume::aabb(DVec3::new(0.0, 0.0, -2.0), DVec3::new(1.0, 1.0, 6.0));
        let (min, max) = volume.extent_along(DVec3::Z);
        assert!((min + 2.0).abs() < 1e-12);
        assert!((max - 6.0).abs() < 1e-12);
    }
}
