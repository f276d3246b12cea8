//! Screen-space error metric.
//!
//! Projects a tile's geometric error into pixels for the current view. Tiles
//! whose error exceeds the configured budget are refined.

use glam::DVec3;
use strata_config::TraversalConfig;
use strata_cull::{BoundingVolume, Camera, Projection};

use crate::Viewport;

/// Distances below this are clamped to avoid dividing by zero for tiles
/// that contain the viewer.
const MIN_DISTANCE: f64 = 1e-7;

/// Fog-based relaxation applied to perspective errors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicError {
    /// Fog density for this frame.
    pub density: f64,
    /// Pixels subtracted at full fog.
    pub factor: f64,
}

/// Fog amount in `[0, 1)` at `distance` for the given density.
#[must_use]
pub fn fog(distance: f64, density: f64) -> f64 {
    let scalar = distance * density;
    1.0 - (-(scalar * scalar)).exp()
}

/// Pixel error of a tile with `geometric_error` seen from `distance`.
#[must_use]
pub fn screen_space_error(
    geometric_error: f64,
    distance: f64,
    viewport: Viewport,
    projection: &Projection,
    dynamic: Option<DynamicError>,
) -> f64 {
    if geometric_error == 0.0 {
        return 0.0;
    }

    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);

    match *projection {
        Projection::Orthographic {
            half_width,
            half_height,
        } => {
            let pixel_size = (2.0 * half_width).max(2.0 * half_height) / width.max(height);
            geometric_error / pixel_size
        }
        Projection::Perspective { fov_y, .. } => {
            let distance = distance.max(MIN_DISTANCE);
            let sse_denominator = 2.0 * (0.5 * fov_y).tan();
            let mut error = geometric_error * height / (distance * sse_denominator);
            if let Some(dynamic) = dynamic {
                error -= fog(distance, dynamic.density) * dynamic.factor;
            }
            error
        }
    }
}

/// Fog density for this frame.
///
/// Density peaks when the camera looks towards the horizon from low above the
/// tileset and fades out as it climbs past the top of `root_volume` or looks
/// straight along `up`.
#[must_use]
pub fn dynamic_density(
    config: &TraversalConfig,
    camera: &Camera,
    root_volume: &BoundingVolume,
    up: DVec3,
) -> f64 {
    let (minimum_height, maximum_height) = root_volume.extent_along(up);
    let height = camera.position.dot(up);

    let height_close = minimum_height
        + (maximum_height - minimum_height) * config.dynamic_screen_space_error_height_falloff;
    let span = maximum_height - height_close;
    let t = if span > 0.0 {
        ((height - height_close) / span).clamp(0.0, 1.0)
    } else if height > height_close {
        1.0
    } else {
        0.0
    };

    let horizon_factor = (1.0 - camera.forward().dot(up).abs()) * (1.0 - t);
    config.dynamic_screen_space_error_density * horizon_factor
}
