use glam::{Vec2, Vec3};

use crate::error::TerrainError;
use crate::grid::HeightGrid;

/// World-space vertex grid derived from a heightfield.
///
/// Vertex `(x, z)` sits at `positions[x + z * size_x]`. The surface is
/// immutable once built; meshes are produced by reading it.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSurface {
    positions: Vec<Vec3>,
    size_x: u32,
    size_z: u32,
}

impl TerrainSurface {
    pub fn new(positions: Vec<Vec3>, size_x: u32, size_z: u32) -> Result<Self, TerrainError> {
        let expected = size_x as usize * size_z as usize;
        if positions.len() != expected {
            return Err(TerrainError::GridShape {
                width: size_x,
                height: size_z,
                expected,
                actual: positions.len(),
            });
        }
        Ok(Self {
            positions,
            size_x,
            size_z,
        })
    }

    /// Scales grid sample `(x, z)` to `(x * cell.x, h * cell.y, z * cell.z)`.
    pub fn from_height_grid(grid: &HeightGrid, cell_size: Vec3) -> Self {
        Self::from_fn(grid.width(), grid.height(), |x, z| {
            Vec3::new(x as f32, grid.get(x, z), z as f32) * cell_size
        })
    }

    pub fn flat(size_x: u32, size_z: u32, cell_size: Vec2) -> Self {
        Self::from_fn(size_x, size_z, |x, z| {
            Vec3::new(x as f32 * cell_size.x, 0.0, z as f32 * cell_size.y)
        })
    }

    /// A single gaussian bump of height `magnitude` centred on `center`
    /// (world XZ).
    pub fn gaussian(
        size_x: u32,
        size_z: u32,
        cell_size: Vec2,
        magnitude: f32,
        center: Vec2,
        std_dev: f32,
    ) -> Self {
        let two_var = 2.0 * std_dev * std_dev;
        Self::from_fn(size_x, size_z, |x, z| {
            let xz = Vec2::new(x as f32 * cell_size.x, z as f32 * cell_size.y);
            let y = magnitude * (-(center - xz).length_squared() / two_var).exp();
            Vec3::new(xz.x, y, xz.y)
        })
    }

    fn from_fn(size_x: u32, size_z: u32, mut f: impl FnMut(u32, u32) -> Vec3) -> Self {
        let mut positions = Vec::with_capacity(size_x as usize * size_z as usize);
        for z in 0..size_z {
            for x in 0..size_x {
                positions.push(f(x, z));
            }
        }
        Self {
            positions,
            size_x,
            size_z,
        }
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    pub fn size_z(&self) -> u32 {
        self.size_z
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn index(&self, x: u32, z: u32) -> usize {
        x as usize + z as usize * self.size_x as usize
    }

    /// Panics if `(x, z)` lies outside the surface.
    #[inline]
    pub fn position(&self, x: u32, z: u32) -> Vec3 {
        assert!(
            x < self.size_x && z < self.size_z,
            "surface vertex ({x}, {z}) outside {}x{}",
            self.size_x,
            self.size_z
        );
        self.positions[self.index(x, z)]
    }

    /// Lowest vertex elevation; 0 for an empty surface.
    pub fn min_height(&self) -> f32 {
        self.positions.iter().map(|p| p.y).reduce(f32::min).unwrap_or(0.0)
    }

    /// Highest vertex elevation; 0 for an empty surface.
    pub fn max_height(&self) -> f32 {
        self.positions.iter().map(|p| p.y).reduce(f32::max).unwrap_or(0.0)
    }

    /// Upward normal of quad `(x, z)..(x + 1, z + 1)`, unnormalized.
    ///
    /// Sums the cross product of the two quad edges meeting at each of the
    /// four corners. Returns zero outside `[0, size_x - 1) x [0, size_z - 1)`.
    pub fn face_normal(&self, x: u32, z: u32) -> Vec3 {
        if x >= self.size_x.saturating_sub(1) || z >= self.size_z.saturating_sub(1) {
            return Vec3::ZERO;
        }

        let a = self.position(x, z);
        let b = self.position(x + 1, z);
        let c = self.position(x, z + 1);
        let d = self.position(x + 1, z + 1);

        (c - a).cross(b - a) + (a - b).cross(d - b) + (b - d).cross(c - d) + (d - c).cross(a - c)
    }

    /// Sum of the unit normals of the up to four quadrants touching vertex
    /// `(x, z)`, unnormalized. Returns zero outside the surface.
    pub fn vertex_normal(&self, x: u32, z: u32) -> Vec3 {
        if x >= self.size_x || z >= self.size_z {
            return Vec3::ZERO;
        }

        let origin = self.position(x, z);
        let mut sum = Vec3::ZERO;

        for (dx, dz) in [(-1i64, -1i64), (1, -1), (-1, 1), (1, 1)] {
            let nx = x as i64 + dx;
            let nz = z as i64 + dz;
            if nx < 0 || nz < 0 || nx >= self.size_x as i64 || nz >= self.size_z as i64 {
                continue;
            }

            let along_x = self.position(nx as u32, z) - origin;
            let along_z = self.position(x, nz as u32) - origin;
            // Swap the operands on mirrored quadrants so every normal points up.
            let n = if dx * dz > 0 {
                along_z.cross(along_x)
            } else {
                along_x.cross(along_z)
            };
            sum += n.normalize_or_zero();
        }

        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diamond_square::generate_random;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    fn ramp(size: u32) -> TerrainSurface {
        let mut grid = HeightGrid::new(size, size);
        for z in 0..size {
            for x in 0..size {
                grid.set(x, z, x as f32);
            }
        }
        TerrainSurface::from_height_grid(&grid, Vec3::ONE)
    }

    #[test]
    fn positions_scale_grid_samples() {
        let grid = HeightGrid::from_values(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let surface = TerrainSurface::from_height_grid(&grid, Vec3::new(4.0, 0.5, 2.0));
        assert_eq!(surface.positions().len(), 4);
        assert_eq!(surface.position(1, 0), Vec3::new(4.0, 0.5, 0.0));
        assert_eq!(surface.position(0, 1), Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(surface.position(1, 1), Vec3::new(4.0, 1.5, 2.0));
        assert_eq!(surface.min_height(), 0.0);
        assert_eq!(surface.max_height(), 1.5);
    }

    #[test]
    fn new_rejects_mismatched_positions() {
        assert!(TerrainSurface::new(vec![Vec3::ZERO; 5], 2, 3).is_err());
        assert!(TerrainSurface::new(vec![Vec3::ZERO; 6], 2, 3).is_ok());
    }

    #[test]
    fn flat_face_normal_points_up_unnormalized() {
        let surface = TerrainSurface::flat(3, 3, Vec2::new(2.0, 3.0));
        let n = surface.face_normal(1, 1);
        assert!(approx_vec(n, Vec3::new(0.0, 4.0 * 6.0, 0.0)));
    }

    #[test]
    fn face_normal_outside_interior_is_zero() {
        let surface = TerrainSurface::flat(3, 3, Vec2::ONE);
        assert_eq!(surface.face_normal(2, 0), Vec3::ZERO);
        assert_eq!(surface.face_normal(0, 2), Vec3::ZERO);
        assert_eq!(surface.face_normal(10, 10), Vec3::ZERO);
        assert_eq!(surface.face_normal(u32::MAX, 0), Vec3::ZERO);
        assert_eq!(surface.face_normal(0, u32::MAX), Vec3::ZERO);
        assert_eq!(surface.vertex_normal(u32::MAX, u32::MAX), Vec3::ZERO);
    }

    #[test]
    fn ramp_normals_lean_against_slope() {
        let surface = ramp(4);
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!(approx_vec(surface.face_normal(1, 1).normalize(), expected));
        for (x, z) in [(0, 0), (1, 1), (3, 3), (3, 0), (2, 3)] {
            assert!(approx_vec(surface.vertex_normal(x, z).normalize(), expected));
        }
    }

    #[test]
    fn vertex_normal_counts_available_quadrants() {
        let surface = TerrainSurface::flat(3, 3, Vec2::ONE);
        assert!(approx_vec(surface.vertex_normal(0, 0), Vec3::Y));
        assert!(approx_vec(surface.vertex_normal(1, 0), Vec3::Y * 2.0));
        assert!(approx_vec(surface.vertex_normal(1, 1), Vec3::Y * 4.0));
        assert_eq!(surface.vertex_normal(3, 0), Vec3::ZERO);
    }

    #[test]
    fn gaussian_peaks_at_center() {
        let surface =
            TerrainSurface::gaussian(9, 9, Vec2::ONE, 5.0, Vec2::new(4.0, 4.0), 2.0);
        assert!((surface.position(4, 4).y - 5.0).abs() < 1e-5);
        assert!((surface.max_height() - 5.0).abs() < 1e-5);
        assert!(surface.position(0, 0).y < surface.position(2, 2).y);
        assert!(surface.position(0, 4).y > 0.0);
        assert!(approx_vec(surface.vertex_normal(4, 4).normalize(), Vec3::Y));
    }

    #[test]
    fn generated_terrain_normals_are_unit_and_up() {
        let mut rng = StdRng::seed_from_u64(21);
        let grid = generate_random(0.5, 4.0, 4, &mut rng);
        let surface = TerrainSurface::from_height_grid(&grid, Vec3::new(4.0, 1.0, 4.0));

        for z in 1..surface.size_z() - 1 {
            for x in 1..surface.size_x() - 1 {
                let n = surface.vertex_normal(x, z).normalize();
                assert!((n.length() - 1.0).abs() < 1e-4);
                assert!(n.y >= 0.0);
                assert!(surface.face_normal(x, z).y >= 0.0);
            }
        }
    }
}
