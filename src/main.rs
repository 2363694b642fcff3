use bevy::prelude::*;

mod game;

use game::ViewerPlugin;
use terrain::{TerrainConfig, TileTypes};

const TERRAIN_CONFIG_PATH: &str = "assets/terrain.ron";
const TILE_TYPES_PATH: &str = "assets/tiles.ron";

fn main() {
    let terrain_config = TerrainConfig::load_from_ron_file(TERRAIN_CONFIG_PATH);
    let tile_types = TileTypes::load_from_ron_file(TILE_TYPES_PATH);

    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb(0.60, 0.80, 0.95)))
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 30.0,
            affects_lightmapped_meshes: false,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Fractal Terrain".to_string(),
                ..default()
            }),
            ..default()
        }));

    // Config problems are only reported once the log plugin is installed.
    let terrain_config = terrain_config.unwrap_or_else(|e| {
        warn!("{TERRAIN_CONFIG_PATH}: {e}; using defaults");
        TerrainConfig::default()
    });
    let tile_types = tile_types.unwrap_or_else(|e| {
        warn!("{TILE_TYPES_PATH}: {e}; using defaults");
        TileTypes::default()
    });

    app.add_plugins(ViewerPlugin {
        terrain_config,
        tile_types,
    })
    .run();
}
