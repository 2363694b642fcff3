use bevy::log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{MAX_MESH_VERTICES, TerrainError};
use crate::surface::TerrainSurface;

/// Vertex-space window of a surface: `count_x * count_z` vertices starting at
/// `(x, z)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub z: u32,
    pub count_x: u32,
    pub count_z: u32,
}

impl Rect {
    pub fn new(x: u32, z: u32, count_x: u32, count_z: u32) -> Self {
        Self {
            x,
            z,
            count_x,
            count_z,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.count_x as usize * self.count_z as usize
    }

    pub fn quad_count(&self) -> usize {
        self.count_x.saturating_sub(1) as usize * self.count_z.saturating_sub(1) as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshBuildOptions {
    pub include_normals: bool,
    pub use_triangle_strip: bool,
    /// Restricts the mesh to a chunk; `None` meshes the whole surface.
    pub bounds: Option<Rect>,
}

impl MeshBuildOptions {
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Buffers for one chunk, ready to be uploaded by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuildOutput {
    pub vertex_positions: Vec<[f32; 3]>,
    /// Unit normals aligned with `vertex_positions`.
    pub vertex_normals: Option<Vec<[f32; 3]>>,
    pub indices: Vec<u16>,
    pub topology: Topology,
    /// Element count for an indexed draw call.
    pub primitive_count: u32,
}

impl MeshBuildOutput {
    /// Non-degenerate triangles in front-face order, regardless of topology.
    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        let strip = self.topology == Topology::TriangleStrip;
        let step = if strip { 1 } else { 3 };
        self.indices
            .windows(3)
            .enumerate()
            .step_by(step)
            .map(move |(i, w)| {
                // Odd strip triangles alternate winding.
                if strip && i % 2 == 1 {
                    [w[1], w[0], w[2]]
                } else {
                    [w[0], w[1], w[2]]
                }
            })
            .filter(|[a, b, c]| a != b && b != c && a != c)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_positions)
    }

    pub fn normal_bytes(&self) -> Option<&[u8]> {
        self.vertex_normals.as_deref().map(|n| bytemuck::cast_slice(n))
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl TerrainSurface {
    fn resolve_window(&self, bounds: Option<Rect>) -> Result<Rect, TerrainError> {
        let window = bounds.unwrap_or(Rect::new(0, 0, self.size_x(), self.size_z()));

        let end_x = window.x as u64 + window.count_x as u64;
        let end_z = window.z as u64 + window.count_z as u64;
        if end_x > self.size_x() as u64 || end_z > self.size_z() as u64 {
            return Err(TerrainError::WindowOutOfBounds {
                x: window.x,
                z: window.z,
                count_x: window.count_x,
                count_z: window.count_z,
                size_x: self.size_x(),
                size_z: self.size_z(),
            });
        }
        if window.count_x < 2 || window.count_z < 2 {
            return Err(TerrainError::WindowTooSmall {
                count_x: window.count_x,
                count_z: window.count_z,
            });
        }
        if window.vertex_count() > MAX_MESH_VERTICES {
            return Err(TerrainError::IndexCapacity {
                vertices: window.vertex_count(),
                max: MAX_MESH_VERTICES,
            });
        }

        Ok(window)
    }

    /// Tessellates the surface, or the window in `options.bounds`, into one
    /// mesh with 16-bit indices.
    pub fn build_mesh(&self, options: &MeshBuildOptions) -> Result<MeshBuildOutput, TerrainError> {
        let window = self.resolve_window(options.bounds)?;

        let mut vertex_positions = Vec::with_capacity(window.vertex_count());
        for z in window.z..window.z + window.count_z {
            for x in window.x..window.x + window.count_x {
                vertex_positions.push(self.position(x, z).to_array());
            }
        }

        let vertex_normals = options.include_normals.then(|| {
            let mut normals = Vec::with_capacity(window.vertex_count());
            for z in window.z..window.z + window.count_z {
                for x in window.x..window.x + window.count_x {
                    normals.push(self.vertex_normal(x, z).normalize_or_zero().to_array());
                }
            }
            normals
        });

        let (indices, topology) = if options.use_triangle_strip {
            (
                triangle_strip_indices(window.count_x, window.count_z),
                Topology::TriangleStrip,
            )
        } else {
            (
                triangle_list_indices(window.count_x, window.count_z),
                Topology::TriangleList,
            )
        };

        debug!(
            "built {:?} mesh for window {:?}: {} vertices, {} indices",
            topology,
            window,
            vertex_positions.len(),
            indices.len()
        );

        Ok(MeshBuildOutput {
            vertex_positions,
            vertex_normals,
            primitive_count: indices.len() as u32,
            indices,
            topology,
        })
    }

    /// Splits the surface into windows of `quads_per_chunk` quads per side.
    ///
    /// Neighbouring windows share their border row or column of vertices, so
    /// each quad is covered by exactly one window.
    pub fn chunk_windows(&self, quads_per_chunk: u32) -> Vec<Rect> {
        let step = quads_per_chunk.max(1);
        let span = step.saturating_add(1);
        let mut windows = Vec::new();

        let mut z = 0u32;
        while z < self.size_z().saturating_sub(1) {
            let count_z = span.min(self.size_z() - z);
            let mut x = 0u32;
            while x < self.size_x().saturating_sub(1) {
                let count_x = span.min(self.size_x() - x);
                windows.push(Rect::new(x, z, count_x, count_z));
                x = x.saturating_add(step);
            }
            z = z.saturating_add(step);
        }

        windows
    }
}

/// Two triangles per quad, offsets `(0,0) (0,1) (1,0)` and `(1,0) (0,1) (1,1)`.
fn triangle_list_indices(count_x: u32, count_z: u32) -> Vec<u16> {
    const OFFSETS: [(u32, u32); 6] = [(0, 0), (0, 1), (1, 0), (1, 0), (0, 1), (1, 1)];

    let idx = |x: u32, z: u32| (x + z * count_x) as u16;
    let quads = (count_x - 1) as usize * (count_z - 1) as usize;
    let mut indices = Vec::with_capacity(quads * OFFSETS.len());

    for z in 0..count_z - 1 {
        for x in 0..count_x - 1 {
            for (ox, oz) in OFFSETS {
                indices.push(idx(x + ox, z + oz));
            }
        }
    }

    indices
}

/// One strip zig-zagging across every row, stitched with degenerate
/// triangles.
///
/// Each row contributes `2 * count_x + 2` indices, so every real triangle
/// starts on an odd position and faces down. Appending the last corner makes
/// the length odd, and reversing an odd-length strip flips every triangle up.
fn triangle_strip_indices(count_x: u32, count_z: u32) -> Vec<u16> {
    let idx = |x: u32, z: u32| (x + z * count_x) as u16;
    let row_len = 2 * count_x as usize + 2;
    let mut indices = Vec::with_capacity(row_len * (count_z - 1) as usize + 1);

    for z in 0..count_z - 1 {
        indices.push(idx(0, z));
        for x in 0..count_x {
            indices.push(idx(x, z));
            indices.push(idx(x, z + 1));
        }
        indices.push(idx(count_x - 1, z + 1));
    }

    if indices.len() % 2 == 0 {
        indices.push(idx(count_x - 1, count_z - 1));
    }
    indices.reverse();
    indices
}
