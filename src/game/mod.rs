pub mod camera;
pub mod lighting;
pub mod ui;

use bevy::pbr::wireframe::WireframePlugin;
use bevy::prelude::*;
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};

use terrain as terrain_crate;

pub struct ViewerPlugin {
    pub terrain_config: terrain_crate::TerrainConfig,
    pub tile_types: terrain_crate::TileTypes,
}

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(camera::OrbitCameraSettings::default())
            .insert_resource(ui::UiInputCaptureRes::default())
            .add_plugins((EguiPlugin::default(), WireframePlugin::default()))
            .add_plugins(terrain_crate::TerrainPlugin {
                config: self.terrain_config.clone(),
                tiles: self.tile_types.clone(),
            })
            .add_systems(Startup, (camera::setup_viewer, lighting::setup_sun_light))
            .add_systems(
                Update,
                (
                    ui::update_ui_input_capture,
                    ui::regenerate_hotkey,
                    ui::sync_wireframe,
                    camera::focus_on_terrain,
                    camera::orbit_camera_input,
                    camera::update_orbit_camera,
                )
                    .chain(),
            )
            .add_systems(EguiPrimaryContextPass, ui::terrain_panel_system);
    }
}
