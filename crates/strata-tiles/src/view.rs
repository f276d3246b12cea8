//! Per-frame viewer state handed to the traversal.

use strata_config::ViewConfig;
use strata_cull::{Camera, Frustum, Projection};

/// Render target size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height, or 1 for a degenerate viewport.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }
}

/// Everything the traversal needs to know about the viewer for one frame.
///
/// `frame_number` must increase on every call to
/// [`Tileset::select_tiles`](crate::Tileset::select_tiles); the per-tile frame
/// stamps rely on it.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub frame_number: u64,
    pub camera: Camera,
    pub frustum: Frustum,
    pub viewport: Viewport,
}

impl ViewState {
    /// Build a view state, deriving the culling frustum from the camera.
    pub fn new(frame_number: u64, camera: Camera, viewport: Viewport) -> Self {
        let frustum = camera.frustum();
        Self {
            frame_number,
            camera,
            frustum,
            viewport,
        }
    }

    /// A perspective camera configured from [`ViewConfig`].
    pub fn camera_from_config(config: &ViewConfig) -> Camera {
        let viewport = Viewport::new(config.width, config.height);
        Camera {
            projection: Projection::Perspective {
                fov_y: config.fov_y_degrees.to_radians(),
                aspect_ratio: viewport.aspect_ratio(),
            },
            near: config.near,
            far: config.far,
            ..Camera::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_from_config_uses_viewport_aspect() {
        let config = ViewConfig {
            width: 1000,
            height: 500,
            fov_y_degrees: 90.0,
            ..ViewConfig::default()
        };
        let camera = ViewState::camera_from_config(&config);
        match camera.projection {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
            } => {
                assert!((fov_y - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
                assert!((aspect_ratio - 2.0).abs() < 1e-12);
            }
            Projection::Orthographic { .. } => panic!("expected perspective"),
        }
    }

    #[test]
    fn test_degenerate_viewport_aspect() {
        assert_eq!(Viewport::new(640, 0).aspect_ratio(), 1.0);
    }
}
