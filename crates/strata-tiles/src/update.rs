//! Per-frame update of the view-dependent tile state: transforms, distances,
//! screen-space error and visibility.

use strata_cull::PlaneMask;

use crate::sse::{DynamicError, screen_space_error};
use crate::{ChildrenVisibility, Refine, TileId, Tileset, ViewState};

impl Tileset {
    fn dynamic_error(&self) -> Option<DynamicError> {
        self.config
            .dynamic_screen_space_error
            .then_some(DynamicError {
                density: self.dynamic_density,
                factor: self.config.dynamic_screen_space_error_factor,
            })
    }

    /// Screen-space error of `geometric_error` seen from `distance` under the
    /// current view and fog settings.
    pub(crate) fn error_at(&self, geometric_error: f64, distance: f64, view: &ViewState) -> f64 {
        screen_space_error(
            geometric_error,
            distance,
            view.viewport,
            &view.camera.projection,
            self.dynamic_error(),
        )
    }

    /// Recompute the view-dependent attributes of one tile. Runs at most once
    /// per tile per frame; the parent must already be up to date.
    pub(crate) fn update_visibility(&mut self, id: TileId, view: &ViewState) {
        let frame = view.frame_number;
        if self.tiles[id.index()].visibility_frame == frame {
            return;
        }

        let (parent_transform, parent_mask) = match self.tiles[id.index()].parent {
            Some(parent) => {
                let parent = &self.tiles[parent.index()];
                (parent.computed_transform, parent.plane_mask)
            }
            None => (self.root_transform, PlaneMask::INDETERMINATE),
        };
        let dynamic = self.dynamic_error();
        let camera = &view.camera;

        let tile = &mut self.tiles[id.index()];
        tile.visibility_frame = frame;
        tile.computed_transform = parent_transform * tile.transform;
        tile.world_bounding_volume = tile.bounding_volume.transform(&tile.computed_transform);

        let volume = &tile.world_bounding_volume;
        tile.distance_to_camera = volume.distance_to(camera.position);
        tile.center_z_depth = (volume.center() - camera.position).dot(camera.forward());
        tile.screen_space_error = screen_space_error(
            tile.geometric_error,
            tile.distance_to_camera,
            view.viewport,
            &camera.projection,
            dynamic,
        );
        tile.plane_mask = view.frustum.compute_visibility(volume, parent_mask);
        tile.in_request_volume = tile.viewer_request_volume.is_none_or(|request| {
            request
                .transform(&tile.computed_transform)
                .contains_point(camera.position)
        });
        tile.visible = tile.plane_mask.is_visible() && tile.in_request_volume;
    }

    /// Full visibility update: basic visibility plus the culling
    /// optimizations that may hide an otherwise visible tile.
    pub(crate) fn update_tile(&mut self, id: TileId, view: &ViewState) {
        self.update_visibility(id, view);

        let frame = view.frame_number;
        let tile = &mut self.tiles[id.index()];
        if tile.updated_frame == frame {
            return;
        }
        tile.updated_frame = frame;

        if !tile.visible {
            self.statistics.culled += 1;
            return;
        }

        if self.meets_screen_space_error_early(id, view) {
            self.tiles[id.index()].visible = false;
            return;
        }

        let tile = &self.tiles[id.index()];
        if self.config.cull_with_children_bounds
            && tile.refine == Refine::Replace
            && !tile.children.is_empty()
            && !self.any_children_visible(id, view)
        {
            self.tiles[id.index()].visible = false;
            self.statistics.culled_with_children_union += 1;
        }
    }

    /// A child of an additive parent that already meets the budget at the
    /// parent's error adds nothing the parent does not show.
    fn meets_screen_space_error_early(&self, id: TileId, view: &ViewState) -> bool {
        let tile = &self.tiles[id.index()];
        let Some(parent) = tile.parent else {
            return false;
        };
        let parent = &self.tiles[parent.index()];
        if parent.refine != Refine::Additive {
            return false;
        }
        self.error_at(parent.geometric_error, tile.distance_to_camera, view)
            <= self.config.maximum_screen_space_error
    }

    fn any_children_visible(&mut self, id: TileId, view: &ViewState) -> bool {
        let mut any_visible = false;
        for index in 0..self.tiles[id.index()].children.len() {
            let child = self.tiles[id.index()].children[index];
            self.update_visibility(child, view);
            any_visible |= self.tiles[child.index()].visible;
        }
        any_visible
    }

    /// Update every child of `id` and summarize their visibility.
    ///
    /// A child inside the frustum but with the viewer outside its request
    /// volume gets an `OUTSIDE` plane mask so its subtree is culled.
    pub(crate) fn update_children(&mut self, id: TileId, view: &ViewState) -> ChildrenVisibility {
        let mut flags = ChildrenVisibility::empty();
        for index in 0..self.tiles[id.index()].children.len() {
            let child = self.tiles[id.index()].children[index];
            self.update_tile(child, view);

            let child = &mut self.tiles[child.index()];
            if child.visible {
                flags |= ChildrenVisibility::VISIBLE;
            }
            if child.in_request_volume {
                flags |= ChildrenVisibility::IN_REQUEST_VOLUME;
                if child.visible {
                    flags |= ChildrenVisibility::VISIBLE_IN_REQUEST_VOLUME;
                }
            } else if child.plane_mask.is_visible() {
                flags |= ChildrenVisibility::VISIBLE_NOT_IN_REQUEST_VOLUME;
                child.plane_mask = PlaneMask::OUTSIDE;
            }
        }
        self.tiles[id.index()].children_visibility = flags;
        flags
    }
}

#[cfg(test)]
mod tests {
    use glam::{DMat4, DVec3};
    use strata_cull::{BoundingVolume, Camera};

    use crate::{TileDescriptor, TilesetBuilder, Viewport};

    use super::*;

    fn cube(center: DVec3, half: f64) -> BoundingVolume {
        BoundingVolume::aabb(center - DVec3::splat(half), center + DVec3::splat(half))
    }

    fn view(frame: u64, position: DVec3, target: DVec3) -> ViewState {
        ViewState::new(frame, Camera::looking_at(position, target, DVec3::Y), Viewport::new(800, 600))
    }

    #[test]
    fn test_child_inherits_parent_transform() {
        let mut builder = TilesetBuilder::new()
            .root_transform(DMat4::from_translation(DVec3::new(0.0, 0.0, -100.0)));
        let root = builder.add_root(
            TileDescriptor::new(cube(DVec3::ZERO, 10.0), 4.0)
                .with_transform(DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0))),
        );
        let child = builder.add_child(root, TileDescriptor::new(cube(DVec3::ZERO, 5.0), 1.0));
        let mut tileset = builder.build().unwrap();

        let view = view(1, DVec3::ZERO, DVec3::NEG_Z);
        tileset.update_tile(root, &view);
        tileset.update_children(root, &view);

        let child = tileset.tile(child).unwrap();
        assert_eq!(child.world_bounding_volume().center(), DVec3::new(5.0, 0.0, -100.0));
        assert!((child.distance_to_camera() - 95.0).abs() < 1e-9);
        assert!((child.center_z_depth() - 100.0).abs() < 1e-9);
        assert!(child.screen_space_error() > 0.0);
    }

    #[test]
    fn test_update_runs_once_per_frame() {
        let mut builder = TilesetBuilder::new();
        let root = builder.add_root(TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -50.0), 1.0), 1.0));
        let mut tileset = builder.build().unwrap();

        tileset.update_tile(root, &view(1, DVec3::ZERO, DVec3::NEG_Z));
        let first = tileset.tile(root).unwrap().distance_to_camera();
        // Same frame, different camera: the cached values stay.
        tileset.update_tile(root, &view(1, DVec3::new(0.0, 0.0, 20.0), DVec3::NEG_Z));
        assert_eq!(tileset.tile(root).unwrap().distance_to_camera(), first);

        tileset.update_tile(root, &view(2, DVec3::new(0.0, 0.0, 20.0), DVec3::NEG_Z));
        assert!(tileset.tile(root).unwrap().distance_to_camera() > first);
    }

    #[test]
    fn test_request_volume_gates_visibility() {
        let mut builder = TilesetBuilder::new();
        let root = builder.add_root(TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -50.0), 20.0), 8.0));
        let near_only = builder.add_child(
            root,
            TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -50.0), 10.0), 1.0)
                .with_viewer_request_volume(cube(DVec3::new(0.0, 0.0, -50.0), 30.0)),
        );
        let mut tileset = builder.build().unwrap();

        let far = view(1, DVec3::new(0.0, 0.0, 100.0), DVec3::new(0.0, 0.0, -50.0));
        tileset.update_tile(root, &far);
        let flags = tileset.update_children(root, &far);
        assert!(flags.contains(ChildrenVisibility::VISIBLE_NOT_IN_REQUEST_VOLUME));
        assert!(!flags.contains(ChildrenVisibility::VISIBLE_IN_REQUEST_VOLUME));
        let child = tileset.tile(near_only).unwrap();
        assert!(!child.is_visible());
        assert_eq!(child.plane_mask(), PlaneMask::OUTSIDE);

        let close = view(2, DVec3::new(0.0, 0.0, -25.0), DVec3::new(0.0, 0.0, -50.0));
        tileset.update_tile(root, &close);
        let flags = tileset.update_children(root, &close);
        assert!(flags.contains(ChildrenVisibility::VISIBLE_IN_REQUEST_VOLUME));
        assert!(flags.contains(ChildrenVisibility::IN_REQUEST_VOLUME));
        assert!(tileset.tile(near_only).unwrap().is_visible());
    }

    #[test]
    fn test_outside_parent_culls_child_without_testing() {
        let mut builder = TilesetBuilder::new();
        let root = builder.add_root(TileDescriptor::new(cube(DVec3::new(0.0, 0.0, 50.0), 1.0), 8.0));
        // The child volume is in view, but the parent is behind the camera.
        let child = builder.add_child(root, TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -50.0), 1.0), 1.0));
        let mut tileset = builder.build().unwrap();

        let view = view(1, DVec3::ZERO, DVec3::NEG_Z);
        tileset.update_tile(root, &view);
        assert_eq!(tileset.tile(root).unwrap().plane_mask(), PlaneMask::OUTSIDE);
        tileset.update_children(root, &view);
        assert_eq!(tileset.tile(child).unwrap().plane_mask(), PlaneMask::OUTSIDE);
    }

    #[test]
    fn test_additive_child_meeting_error_early_is_hidden() {
        let mut builder = TilesetBuilder::new();
        let root = builder.add_root(
            TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -500.0), 50.0), 0.5)
                .with_refine(Refine::Additive),
        );
        let child = builder.add_child(root, TileDescriptor::new(cube(DVec3::new(0.0, 0.0, -500.0), 10.0), 0.1));
        let mut tileset = builder.build().unwrap();

        let view = view(1, DVec3::ZERO, DVec3::NEG_Z);
        tileset.update_tile(root, &view);
        let flags = tileset.update_children(root, &view);
        assert!(!tileset.tile(child).unwrap().is_visible());
        assert_eq!(flags, ChildrenVisibility::IN_REQUEST_VOLUME);
    }

    #[test]
    fn test_replace_tile_culled_by_children_union() {
        let mut builder = TilesetBuilder::new();
        // The parent straddles the view; both children sit behind the camera.
        let root = builder.add_root(TileDescriptor::new(cube(DVec3::ZERO, 100.0), 8.0));
        builder.add_child(root, TileDescriptor::new(cube(DVec3::new(-50.0, 0.0, 60.0), 10.0), 1.0));
        builder.add_child(root, TileDescriptor::new(cube(DVec3::new(50.0, 0.0, 60.0), 10.0), 1.0));
        let mut tileset = builder.build().unwrap();

        tileset.update_tile(root, &view(1, DVec3::ZERO, DVec3::NEG_Z));
        assert!(!tileset.tile(root).unwrap().is_visible());
        assert_eq!(tileset.statistics().culled_with_children_union, 1);

        let mut config = tileset.config().clone();
        config.cull_with_children_bounds = false;
        tileset.set_config(config).unwrap();
        tileset.update_tile(root, &view(2, DVec3::ZERO, DVec3::NEG_Z));
        assert!(tileset.tile(root).unwrap().is_visible());
    }
}
