//! Double-precision camera producing reverse-Z view and projection matrices.

use glam::{DMat3, DMat4, DQuat, DVec3};

use crate::Frustum;

/// A viewer placed in tileset world space.
#[derive(Debug, Clone)]
pub struct Camera {
    /// World-space position.
    pub position: DVec3,
    /// Rotation as a unit quaternion. Identity looks down -Z with +Y up.
    pub rotation: DQuat,
    /// Projection parameters.
    pub projection: Projection,
    /// Near clip plane distance (always positive).
    pub near: f64,
    /// Far clip plane distance (always positive, > near).
    pub far: f64,
}

/// Projection type for the camera.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Perspective projection.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f64,
        /// Width / height.
        aspect_ratio: f64,
    },
    /// Orthographic projection.
    Orthographic {
        /// Half-width of the view volume in world units.
        half_width: f64,
        /// Half-height of the view volume in world units.
        half_height: f64,
    },
}

impl Camera {
    /// A perspective camera at `position` looking towards `target`.
    ///
    /// Falls back to the default orientation when `target` coincides with
    /// `position` or `up` is parallel to the view direction.
    pub fn looking_at(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let mut camera = Self {
            position,
            ..Self::default()
        };
        camera.look_at(target, up);
        camera
    }

    /// Rotate the camera to face `target`.
    pub fn look_at(&mut self, target: DVec3, up: DVec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        let Some(right) = forward.cross(up).try_normalize() else {
            return;
        };
        let true_up = right.cross(forward);
        let basis = DMat3::from_cols(right, true_up, -forward);
        self.rotation = DQuat::from_mat3(&basis).normalize();
    }

    /// Compute the view matrix (inverse of camera transform).
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// Compute the projection matrix with reverse-Z: near maps to depth 1,
    /// far to depth 0.
    pub fn projection_matrix(&self) -> DMat4 {
        match self.projection {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
            } => DMat4::perspective_rh(fov_y, aspect_ratio, self.far, self.near),
            Projection::Orthographic {
                half_width,
                half_height,
            } => DMat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.far,
                self.near,
            ),
        }
    }

    /// Compute the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Culling frustum for the current pose and projection.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::NEG_Z
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    /// The right direction vector (+X in camera space).
    pub fn right(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    /// Update the aspect ratio for perspective projection.
    pub fn set_aspect_ratio(&mut self, width: f64, height: f64) {
        if height <= 0.0 {
            return;
        }
        if let Projection::Perspective { aspect_ratio, .. } = &mut self.projection {
            *aspect_ratio = width / height;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            projection: Projection::Perspective {
                fov_y: std::f64::consts::FRAC_PI_3,
                aspect_ratio: 16.0 / 9.0,
            },
            near: 0.1,
            far: 100_000.0,
        }
    }
}
