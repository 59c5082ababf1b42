use bevy::math::{DMat4, DVec3};
use bevy::prelude::*;
use terrella_scene::{Camera, CameraOptions};

use crate::{Layers, RenderContext, RendererSettings, TileTree};

/// The camera pose changed since the previous frame.
///
/// Sent only for frames in which the camera moved. The camera's own
/// `viewchange` bus fires on every [`Camera::update`], moved or not.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ViewChanged {
    pub eye: DVec3,
    pub view_matrix: DMat4,
}

/// The camera came to rest after moving.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MoveEnded {
    pub eye: DVec3,
}

/// Inserts the camera, render context, tile tree and layers, and runs the
/// globe's frame: camera update, tree traversal, then imagery outcomes.
///
/// A [`RenderContext`] inserted before this plugin is kept; otherwise a
/// headless one sized to the camera viewport is created.
#[derive(Debug, Clone, Default)]
pub struct GlobeRendererPlugin {
    pub camera: CameraOptions,
    pub settings: RendererSettings,
}

impl Plugin for GlobeRendererPlugin {
    fn build(&self, app: &mut App) {
        let camera = Camera::try_new(&self.camera).unwrap_or_else(|e| {
            bevy::log::error!("camera options are invalid, using defaults: {}", e);
            Camera::default()
        });
        let settings = match self.settings.validate() {
            Ok(()) => self.settings.clone(),
            Err(e) => {
                bevy::log::error!("renderer settings are invalid, using defaults: {}", e);
                RendererSettings::default()
            }
        };
        if !app.world.contains_resource::<RenderContext>() {
            let (width, height) = camera.viewport_size();
            app.insert_resource(RenderContext::headless(width, height));
        }
        app.insert_resource(camera)
            .insert_resource(settings)
            .init_resource::<TileTree>()
            .init_resource::<Layers>()
            .add_event::<ViewChanged>()
            .add_event::<MoveEnded>()
            .add_systems(
                Update,
                (update_camera, update_tile_tree, apply_layer_outcomes).chain(),
            );
    }
}

fn update_camera(
    mut camera: ResMut<Camera>,
    mut view_changed: EventWriter<ViewChanged>,
    mut move_ended: EventWriter<MoveEnded>,
) {
    camera.update();
    if camera.check_move_end() {
        move_ended.send(MoveEnded {
            eye: camera.get_eye(),
        });
    } else if camera.is_moving() {
        view_changed.send(ViewChanged {
            eye: camera.get_eye(),
            view_matrix: *camera.view_matrix(),
        });
    }
}

fn update_tile_tree(
    camera: Res<Camera>,
    settings: Res<RendererSettings>,
    mut tree: ResMut<TileTree>,
    mut layers: ResMut<Layers>,
    mut context: ResMut<RenderContext>,
) {
    tree.update(&camera, &mut layers, context.device_mut(), &settings);
}

fn apply_layer_outcomes(
    mut tree: ResMut<TileTree>,
    mut layers: ResMut<Layers>,
    mut context: ResMut<RenderContext>,
) {
    for layer in layers.iter_mut() {
        layer.update(&mut tree, context.device_mut());
    }
}
