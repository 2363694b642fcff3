use std::path::Path;

use bevy::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::diamond_square::{DiamondSquare, EdgeRule};
use crate::error::{ConfigError, MAX_MESH_VERTICES};
use crate::mesh::MeshBuildOptions;

/// Upper bound on refinement steps; 10 iterations is a 1025x1025 surface.
pub const MAX_ITERATIONS: u32 = 10;

// --- Config ---

/// How chunk meshes are coloured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    /// Single untextured material.
    Plain,
    /// Elevation bands sampled from the tile atlas.
    #[default]
    Banded,
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainConfig {
    /// Fixed seed for reproducible terrain; a random one is drawn when unset.
    pub seed: Option<u64>,
    /// World size of one grid cell; `y` scales elevations.
    pub cell_size: (f32, f32, f32),
    pub error_constant: f32,
    pub max_seed_height: f32,
    pub iterations: u32,
    pub edge_rule: EdgeRule,
    /// Quads per chunk side.
    pub chunk_quads: u32,
    pub use_triangle_strip: bool,
    pub include_normals: bool,
    pub shading: Shading,
    /// Draw chunk edges instead of filled triangles.
    pub wireframe: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: None,
            cell_size: (4.0, 1.0, 4.0),
            error_constant: 1.5,
            max_seed_height: 70.0,
            iterations: 7,
            edge_rule: EdgeRule::Diamond,
            chunk_quads: 32,
            use_triangle_strip: false,
            include_normals: true,
            shading: Shading::Banded,
            wireframe: false,
        }
    }
}

impl TerrainConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: TerrainConfig = ron::from_str(text)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn load_from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), String> {
        let (cx, cy, cz) = self.cell_size;
        if ![cx, cy, cz].iter().all(|v| v.is_finite()) || cx <= 0.0 || cz <= 0.0 {
            return Err(format!(
                "cell_size {:?} must be finite with positive x and z",
                self.cell_size
            ));
        }
        if !self.error_constant.is_finite() || self.error_constant < 0.0 {
            return Err(format!(
                "error_constant={} must be finite and non-negative",
                self.error_constant
            ));
        }
        if !self.max_seed_height.is_finite() || self.max_seed_height < 0.0 {
            return Err(format!(
                "max_seed_height={} must be finite and non-negative",
                self.max_seed_height
            ));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(format!(
                "iterations={} exceeds the maximum of {MAX_ITERATIONS}",
                self.iterations
            ));
        }
        let chunk_vertices = (self.chunk_quads as usize + 1).pow(2);
        if self.chunk_quads == 0 || chunk_vertices > MAX_MESH_VERTICES {
            return Err(format!(
                "chunk_quads={} must be at least 1 and keep a chunk within {MAX_MESH_VERTICES} vertices",
                self.chunk_quads
            ));
        }
        Ok(())
    }

    pub fn cell_size(&self) -> Vec3 {
        let (x, y, z) = self.cell_size;
        Vec3::new(x, y, z)
    }

    pub fn diamond_square(&self) -> DiamondSquare {
        DiamondSquare::new(self.error_constant).with_edge_rule(self.edge_rule)
    }

    pub fn mesh_options(&self) -> MeshBuildOptions {
        MeshBuildOptions {
            include_normals: self.include_normals,
            use_triangle_strip: self.use_triangle_strip,
            bounds: None,
        }
    }
}

// --- Tiles ---

#[derive(Clone, Debug, Deserialize)]
pub struct TileTypesFile {
    pub tiles: Vec<TileType>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TileType {
    pub name: String,
    pub color_srgb: (f32, f32, f32),
    /// Select this tile if the normalized elevation is below `height_lt`.
    pub height_lt: f32,
}

/// Elevation bands, lowest first, sampled through a 1xN colour atlas.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct TileTypes {
    pub tiles: Vec<TileType>,
}

impl Default for TileTypes {
    fn default() -> Self {
        let tile = |name: &str, color_srgb, height_lt| TileType {
            name: name.to_string(),
            color_srgb,
            height_lt,
        };
        Self {
            tiles: vec![
                tile("grass", (0.30, 0.52, 0.20), 0.35),
                tile("dirt", (0.45, 0.36, 0.24), 0.60),
                tile("rock", (0.48, 0.47, 0.45), 0.82),
                tile("snow", (0.94, 0.95, 0.97), 1.01),
            ],
        }
    }
}

impl TileTypes {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let parsed: TileTypesFile = ron::from_str(text)?;
        let tile_types = TileTypes {
            tiles: parsed.tiles,
        };
        tile_types.validate().map_err(ConfigError::Invalid)?;
        Ok(tile_types)
    }

    pub fn load_from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn tile_count_f32(&self) -> f32 {
        self.tiles.len() as f32
    }

    pub fn pick_tile_index(&self, height: f32) -> u32 {
        // Validation guarantees there's at least 1 tile.
        for (i, t) in self.tiles.iter().enumerate() {
            if height < t.height_lt {
                return i as u32;
            }
        }
        (self.tiles.len().saturating_sub(1)) as u32
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tiles.is_empty() {
            return Err("tile types file must define at least one tile".to_string());
        }

        let mut last = f32::NEG_INFINITY;
        for t in &self.tiles {
            if !t.height_lt.is_finite() {
                return Err(format!("tile '{}' has non-finite height_lt", t.name));
            }
            if t.height_lt <= last {
                return Err(format!(
                    "tile '{}' has height_lt={} but previous tile had height_lt={} (must be strictly increasing)",
                    t.name, t.height_lt, last
                ));
            }
            last = t.height_lt;
        }

        Ok(())
    }
}

// --- Resources ---

#[derive(Resource)]
pub struct TerrainAtlas {
    pub material: Handle<StandardMaterial>,
    pub plain: Handle<StandardMaterial>,
}

impl TerrainAtlas {
    pub fn material_for(&self, shading: Shading) -> Handle<StandardMaterial> {
        match shading {
            Shading::Banded => self.material.clone(),
            Shading::Plain => self.plain.clone(),
        }
    }
}

#[derive(Resource, Default)]
pub struct LoadedChunkEntities {
    pub entities: Vec<Entity>,
}

/// Summary of the last generated terrain, for display.
#[derive(Resource, Default, Clone, Debug, PartialEq)]
pub struct TerrainStats {
    pub seed: u64,
    pub size_x: u32,
    pub size_z: u32,
    pub world_extent: Vec3,
    pub min_height: f32,
    pub max_height: f32,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub vertices: usize,
    pub indices: usize,
}

/// Request to rebuild the terrain. `seed: None` draws a fresh one.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct RegenerateTerrain {
    pub seed: Option<u64>,
}
