//! Fractal terrain synthesis and tessellation.
//!
//! [`diamond_square`] refines a heightfield, [`TerrainSurface`] turns it into
//! world-space vertices and normals, and [`TerrainSurface::build_mesh`] emits
//! 16-bit indexed chunk meshes. [`TerrainPlugin`] hands those meshes to Bevy.

pub mod diamond_square;
pub mod error;
pub mod grid;
pub mod mesh;
pub mod render;
pub mod surface;
pub mod types;

pub use diamond_square::{DiamondSquare, EdgeRule, generate, generate_iterative, generate_random};
pub use error::{ConfigError, MAX_MESH_VERTICES, TerrainError};
pub use grid::HeightGrid;
pub use mesh::{MeshBuildOptions, MeshBuildOutput, Rect, Topology};
pub use surface::TerrainSurface;
pub use types::*;

use bevy::prelude::*;

pub struct TerrainPlugin {
    pub config: types::TerrainConfig,
    pub tiles: types::TileTypes,
}

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(self.tiles.clone())
            .init_resource::<types::TerrainStats>()
            .add_message::<types::RegenerateTerrain>()
            .add_systems(Startup, render::setup_terrain_renderer)
            .add_systems(
                Update,
                (render::regenerate_terrain, render::apply_shading).chain(),
            );
    }
}
