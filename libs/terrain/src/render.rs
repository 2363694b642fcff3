use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::mesh::{MeshBuildOutput, Topology};
use crate::surface::TerrainSurface;
use crate::types::{
    LoadedChunkEntities, RegenerateTerrain, TerrainAtlas, TerrainConfig, TerrainStats, TileTypes,
};

#[derive(Component)]
pub struct Chunk;

pub fn setup_terrain_renderer(
    mut commands: Commands,
    config: Res<TerrainConfig>,
    tiles: Res<TileTypes>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut regenerate: MessageWriter<RegenerateTerrain>,
) {
    let atlas_colors: Vec<Color> = tiles
        .tiles
        .iter()
        .map(|t| {
            let (r, g, b) = t.color_srgb;
            Color::srgb(r, g, b)
        })
        .collect();

    let atlas_tex = images.add(make_atlas_1x_n_image(&atlas_colors));
    let material = materials.add(StandardMaterial {
        base_color_texture: Some(atlas_tex),
        perceptual_roughness: 1.0,
        ..default()
    });

    let plain = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.55, 0.52),
        perceptual_roughness: 1.0,
        ..default()
    });

    commands.insert_resource(TerrainAtlas { material, plain });
    commands.insert_resource(LoadedChunkEntities::default());
    regenerate.write(RegenerateTerrain { seed: config.seed });
}

fn make_atlas_1x_n_image(colors: &[Color]) -> Image {
    let mut data = Vec::with_capacity(colors.len() * 4);
    for c in colors {
        let [r, g, b, a] = c.to_srgba().to_u8_array();
        data.extend_from_slice(&[r, g, b, a]);
    }

    let mut image = Image::new(
        Extent3d {
            width: colors.len() as u32,
            height: 1,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    );
    image.sampler = bevy::image::ImageSampler::nearest();
    image
}

/// Rebuilds the heightfield and every chunk mesh when a [`RegenerateTerrain`]
/// request arrives.
pub fn regenerate_terrain(
    mut commands: Commands,
    mut requests: MessageReader<RegenerateTerrain>,
    mut meshes: ResMut<Assets<Mesh>>,
    config: Res<TerrainConfig>,
    tiles: Res<TileTypes>,
    atlas: Option<Res<TerrainAtlas>>,
    mut loaded: ResMut<LoadedChunkEntities>,
    mut stats: ResMut<TerrainStats>,
) {
    // Only the latest request of a frame matters.
    let Some(request) = requests.read().last().copied() else {
        return;
    };
    let Some(atlas) = atlas else {
        return;
    };

    for entity in loaded.entities.drain(..) {
        commands.entity(entity).despawn();
    }

    let seed = request.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = config
        .diamond_square()
        .generate_random(config.max_seed_height, config.iterations, &mut rng);
    let surface = TerrainSurface::from_height_grid(&grid, config.cell_size());

    let mut next = TerrainStats {
        seed,
        size_x: surface.size_x(),
        size_z: surface.size_z(),
        world_extent: surface.position(surface.size_x() - 1, surface.size_z() - 1),
        min_height: surface.min_height(),
        max_height: surface.max_height(),
        ..default()
    };

    let options = config.mesh_options();
    let material = atlas.material_for(config.shading);
    for window in surface.chunk_windows(config.chunk_quads) {
        let output = match surface.build_mesh(&options.with_bounds(window)) {
            Ok(output) => output,
            Err(e) => {
                error!("failed to build terrain chunk {window:?}: {e}");
                next.failed_chunks += 1;
                continue;
            }
        };

        next.chunks += 1;
        next.vertices += output.vertex_positions.len();
        next.indices += output.indices.len();

        let uvs = elevation_uvs(&output, &tiles, next.min_height, next.max_height);
        let mesh_handle = meshes.add(mesh_from_build_output(output, uvs));
        let entity = commands
            .spawn((
                Chunk,
                Mesh3d(mesh_handle),
                MeshMaterial3d(material.clone()),
                Transform::IDENTITY,
            ))
            .id();
        loaded.entities.push(entity);
    }

    info!(
        "generated {}x{} terrain from seed {} ({} chunks, {} vertices, {} indices, heights {:.1}..{:.1})",
        next.size_x,
        next.size_z,
        seed,
        next.chunks,
        next.vertices,
        next.indices,
        next.min_height,
        next.max_height
    );

    *stats = next;
}

/// Swaps chunk materials when the configured shading changes.
pub fn apply_shading(
    config: Res<TerrainConfig>,
    atlas: Option<Res<TerrainAtlas>>,
    mut chunks: Query<&mut MeshMaterial3d<StandardMaterial>, With<Chunk>>,
) {
    if !config.is_changed() {
        return;
    }
    let Some(atlas) = atlas else {
        return;
    };

    let material = atlas.material_for(config.shading);
    for mut chunk_material in &mut chunks {
        if chunk_material.0 != material {
            chunk_material.0 = material.clone();
        }
    }
}

/// Atlas coordinates selecting each vertex's elevation band, where the band
/// is looked up on the `[min_height, max_height]` range mapped to `[0, 1]`.
pub fn elevation_uvs(
    output: &MeshBuildOutput,
    tiles: &TileTypes,
    min_height: f32,
    max_height: f32,
) -> Vec<[f32; 2]> {
    let range = max_height - min_height;
    output
        .vertex_positions
        .iter()
        .map(|p| {
            let t = if range > 0.0 {
                (p[1] - min_height) / range
            } else {
                0.0
            };
            let tile_index = tiles.pick_tile_index(t);
            [(tile_index as f32 + 0.5) / tiles.tile_count_f32(), 0.5]
        })
        .collect()
}

pub fn mesh_from_build_output(output: MeshBuildOutput, uvs: Vec<[f32; 2]>) -> Mesh {
    let topology = match output.topology {
        Topology::TriangleList => PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => PrimitiveTopology::TriangleStrip,
    };

    let mut mesh = Mesh::new(topology, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, output.vertex_positions);
    if let Some(normals) = output.vertex_normals {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    }
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U16(output.indices));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshBuildOptions;
    use crate::types::Shading;
    use bevy::ecs::system::RunSystemOnce;
    use glam::Vec2;

    fn gaussian_mesh(use_triangle_strip: bool) -> MeshBuildOutput {
        TerrainSurface::gaussian(5, 5, Vec2::ONE, 10.0, Vec2::new(2.0, 2.0), 1.0)
            .build_mesh(&MeshBuildOptions {
                include_normals: true,
                use_triangle_strip,
                bounds: None,
            })
            .unwrap()
    }

    #[test]
    fn mesh_keeps_topology_and_sixteen_bit_indices() {
        for strip in [false, true] {
            let output = gaussian_mesh(strip);
            let index_count = output.indices.len();
            let uvs = vec![[0.0, 0.0]; output.vertex_positions.len()];
            let mesh = mesh_from_build_output(output, uvs);

            let expected = if strip {
                PrimitiveTopology::TriangleStrip
            } else {
                PrimitiveTopology::TriangleList
            };
            assert_eq!(mesh.primitive_topology(), expected);
            assert_eq!(mesh.count_vertices(), 25);
            assert!(matches!(mesh.indices(), Some(Indices::U16(i)) if i.len() == index_count));
            assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        }
    }

    #[test]
    fn uvs_select_elevation_bands() {
        let output = gaussian_mesh(false);
        let tiles = TileTypes::default();
        let uvs = elevation_uvs(&output, &tiles, 0.0, 10.0);
        assert_eq!(uvs.len(), output.vertex_positions.len());

        // Corners are lowland, the peak at (2, 2) is snow.
        assert_eq!(uvs[0], [0.125, 0.5]);
        assert_eq!(uvs[12], [0.875, 0.5]);
    }

    #[test]
    fn shading_change_swaps_chunk_materials() {
        let mut materials = Assets::<StandardMaterial>::default();
        let banded = materials.add(StandardMaterial::default());
        let plain = materials.add(StandardMaterial::default());

        let mut world = World::new();
        world.insert_resource(TerrainAtlas {
            material: banded.clone(),
            plain: plain.clone(),
        });
        world.insert_resource(TerrainConfig {
            shading: Shading::Plain,
            ..default()
        });
        let chunk = world.spawn((Chunk, MeshMaterial3d(banded.clone()))).id();
        let other = world.spawn(MeshMaterial3d(banded.clone())).id();

        world.run_system_once(apply_shading).unwrap();

        let material_of = |world: &World, entity: Entity| {
            world
                .get::<MeshMaterial3d<StandardMaterial>>(entity)
                .unwrap()
                .0
                .clone()
        };
        assert_eq!(material_of(&world, chunk), plain);
        assert_eq!(material_of(&world, other), banded);
    }

    #[test]
    fn flat_range_maps_to_lowest_band() {
        let output = TerrainSurface::flat(2, 2, Vec2::ONE)
            .build_mesh(&MeshBuildOptions::default())
            .unwrap();
        let uvs = elevation_uvs(&output, &TileTypes::default(), 0.0, 0.0);
        assert!(uvs.iter().all(|uv| *uv == [0.125, 0.5]));
    }
}
