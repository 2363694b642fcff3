use bevy::log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::HeightGrid;

/// How the edge midpoints of a refined grid are interpolated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeRule {
    /// Average of every in-bounds left/right/up/down neighbour in the refined
    /// grid, square centres included.
    #[default]
    Diamond,
    /// Average of the two original samples at the ends of the edge.
    Pairwise,
}

/// Diamond-square midpoint displacement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiamondSquare {
    /// Scales the `[-1, 1]` random offset added to every new sample.
    pub error_constant: f32,
    pub edge_rule: EdgeRule,
    /// Factor applied to the rectangle size after each iteration.
    pub decay: f32,
}

impl DiamondSquare {
    pub fn new(error_constant: f32) -> Self {
        Self {
            error_constant,
            edge_rule: EdgeRule::Diamond,
            decay: 0.5,
        }
    }

    pub fn with_edge_rule(mut self, edge_rule: EdgeRule) -> Self {
        self.edge_rule = edge_rule;
        self
    }

    /// One refinement step: a `w x h` grid becomes `(2w-1) x (2h-1)`.
    pub fn refine<R: Rng + ?Sized>(
        &self,
        base: &HeightGrid,
        rectangle_size: f32,
        rng: &mut R,
    ) -> HeightGrid {
        let (w, h) = (base.width(), base.height());
        let new_w = (2 * w).saturating_sub(1);
        let new_h = (2 * h).saturating_sub(1);
        let amplitude = self.error_constant * rectangle_size;
        let mut noise = || rng.random_range(-1.0f32..=1.0) * amplitude;

        let mut out = HeightGrid::new(new_w, new_h);

        for y in 0..h {
            for x in 0..w {
                out.set(2 * x, 2 * y, base.get(x, y));
            }
        }

        // Square step: centre of every original cell.
        for y in 0..h.saturating_sub(1) {
            for x in 0..w.saturating_sub(1) {
                let avg = (base.get(x, y)
                    + base.get(x, y + 1)
                    + base.get(x + 1, y)
                    + base.get(x + 1, y + 1))
                    / 4.0;
                out.set(2 * x + 1, 2 * y + 1, avg + noise());
            }
        }

        // Diamond step: the remaining edge midpoints. Their neighbours are all
        // even/even or odd/odd cells, so the fill order does not matter.
        for y in 0..new_h {
            let mut x = (y + 1) % 2;
            while x < new_w {
                let avg = match self.edge_rule {
                    EdgeRule::Diamond => diamond_average(&out, x, y),
                    EdgeRule::Pairwise => pairwise_average(&out, x, y),
                };
                out.set(x, y, avg + noise());
                x += 2;
            }
        }

        out
    }

    /// Applies [`refine`](Self::refine) `iterations` times, starting from a
    /// rectangle size of 1 and shrinking it by [`decay`](Self::decay) each time.
    pub fn refine_iterative<R: Rng + ?Sized>(
        &self,
        base: HeightGrid,
        iterations: u32,
        rng: &mut R,
    ) -> HeightGrid {
        let mut current = base;
        let mut rectangle_size = 1.0f32;

        for i in 0..iterations {
            current = self.refine(&current, rectangle_size, rng);
            debug!(
                "diamond-square iteration {}: {}x{} (rectangle size {})",
                i + 1,
                current.width(),
                current.height(),
                rectangle_size
            );
            rectangle_size *= self.decay;
        }

        current
    }

    /// Seeds a 2x2 grid with uniform heights in `[0, max_seed_height)` and
    /// refines it.
    pub fn generate_random<R: Rng + ?Sized>(
        &self,
        max_seed_height: f32,
        iterations: u32,
        rng: &mut R,
    ) -> HeightGrid {
        let mut seed = HeightGrid::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                seed.set(x, y, rng.random::<f32>() * max_seed_height);
            }
        }
        self.refine_iterative(seed, iterations, rng)
    }
}

fn diamond_average(grid: &HeightGrid, x: u32, y: u32) -> f32 {
    let mut sum = 0.0;
    let mut count = 0u32;
    if x > 0 {
        sum += grid.get(x - 1, y);
        count += 1;
    }
    if x + 1 < grid.width() {
        sum += grid.get(x + 1, y);
        count += 1;
    }
    if y > 0 {
        sum += grid.get(x, y - 1);
        count += 1;
    }
    if y + 1 < grid.height() {
        sum += grid.get(x, y + 1);
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f32 }
}

fn pairwise_average(grid: &HeightGrid, x: u32, y: u32) -> f32 {
    if y % 2 == 0 {
        (grid.get(x - 1, y) + grid.get(x + 1, y)) / 2.0
    } else {
        (grid.get(x, y - 1) + grid.get(x, y + 1)) / 2.0
    }
}

/// Side length of a grid refined `iterations` times from a 2x2 seed, or
/// `None` when it does not fit in a `u32`.
pub fn side_length(iterations: u32) -> Option<u32> {
    1u32.checked_shl(iterations)?.checked_add(1)
}

/// One diamond-square refinement step with the [`EdgeRule::Diamond`] rule.
pub fn generate<R: Rng + ?Sized>(
    base: &HeightGrid,
    error_constant: f32,
    rectangle_size: f32,
    rng: &mut R,
) -> HeightGrid {
    DiamondSquare::new(error_constant).refine(base, rectangle_size, rng)
}

/// Refines `base` `iterations` times, halving the displacement each time.
pub fn generate_iterative<R: Rng + ?Sized>(
    base: HeightGrid,
    error_constant: f32,
    iterations: u32,
    rng: &mut R,
) -> HeightGrid {
    DiamondSquare::new(error_constant).refine_iterative(base, iterations, rng)
}

/// Random 2x2 seed refined `iterations` times; the result is
/// `side_length(iterations)` samples per side.
pub fn generate_random<R: Rng + ?Sized>(
    error_constant: f32,
    max_seed_height: f32,
    iterations: u32,
    rng: &mut R,
) -> HeightGrid {
    DiamondSquare::new(error_constant).generate_random(max_seed_height, iterations, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn raised_corner() -> HeightGrid {
        HeightGrid::from_values(2, 2, vec![0.0, 0.0, 0.0, 10.0]).unwrap()
    }

    #[test]
    fn refinement_doubles_minus_one() {
        let mut rng = StdRng::seed_from_u64(1);
        for (w, h) in [(2, 2), (3, 5), (4, 2), (1, 3)] {
            let base = HeightGrid::new(w, h);
            let out = generate(&base, 1.0, 1.0, &mut rng);
            assert_eq!(out.width(), 2 * w - 1);
            assert_eq!(out.height(), 2 * h - 1);
        }
    }

    #[test]
    fn original_samples_are_preserved() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = generate_random(1.5, 70.0, 2, &mut rng);
        let out = generate(&base, 1.5, 0.25, &mut rng);
        for y in 0..base.height() {
            for x in 0..base.width() {
                assert_eq!(out.get(2 * x, 2 * y), base.get(x, y));
            }
        }
    }

    #[test]
    fn zero_iterations_returns_input() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = raised_corner();
        let out = generate_iterative(base.clone(), 1.5, 0, &mut rng);
        assert_eq!(out, base);
    }

    #[test]
    fn flat_seed_without_noise_stays_flat() {
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate_iterative(HeightGrid::new(2, 2), 0.0, 1, &mut rng);
        assert_eq!((out.width(), out.height()), (3, 3));
        assert!(out.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pairwise_rule_averages_edge_endpoints() {
        let mut rng = StdRng::seed_from_u64(0);
        let out = DiamondSquare::new(0.0)
            .with_edge_rule(EdgeRule::Pairwise)
            .refine_iterative(raised_corner(), 1, &mut rng);

        assert!(approx(out.get(1, 1), 2.5));
        assert!(approx(out.get(1, 0), 0.0));
        assert!(approx(out.get(0, 1), 0.0));
        assert!(approx(out.get(2, 1), 5.0));
        assert!(approx(out.get(1, 2), 5.0));
    }

    #[test]
    fn diamond_rule_divides_by_available_neighbours() {
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate_iterative(raised_corner(), 0.0, 1, &mut rng);

        assert!(approx(out.get(1, 1), 2.5));
        // Border diamonds see two corners and the centre.
        assert!(approx(out.get(1, 0), 2.5 / 3.0));
        assert!(approx(out.get(0, 1), 2.5 / 3.0));
        assert!(approx(out.get(2, 1), 12.5 / 3.0));
        assert!(approx(out.get(1, 2), 12.5 / 3.0));
    }

    #[test]
    fn interior_diamond_uses_four_neighbours() {
        let mut rng = StdRng::seed_from_u64(0);
        let base = HeightGrid::from_values(3, 2, vec![0.0, 4.0, 0.0, 0.0, 4.0, 0.0]).unwrap();
        let out = generate(&base, 0.0, 1.0, &mut rng);
        // (2, 1) sits between two corners of height 4 and two centres of height 2.
        assert!(approx(out.get(1, 1), 2.0));
        assert!(approx(out.get(3, 1), 2.0));
        assert!(approx(out.get(2, 1), 3.0));
    }

    #[test]
    fn same_seed_reproduces_terrain() {
        let a = generate_random(1.5, 70.0, 4, &mut StdRng::seed_from_u64(42));
        let b = generate_random(1.5, 70.0, 4, &mut StdRng::seed_from_u64(42));
        let c = generate_random(1.5, 70.0, 4, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn random_grid_side_follows_iterations() {
        let mut rng = StdRng::seed_from_u64(9);
        for iterations in 0..5 {
            let grid = generate_random(1.0, 10.0, iterations, &mut rng);
            assert_eq!(Some(grid.width()), side_length(iterations));
            assert_eq!(Some(grid.height()), side_length(iterations));
        }
    }

    #[test]
    fn side_length_stops_at_u32_range() {
        assert_eq!(side_length(0), Some(2));
        assert_eq!(side_length(10), Some(1025));
        assert_eq!(side_length(31), Some((1 << 31) + 1));
        assert_eq!(side_length(32), None);
        assert_eq!(side_length(u32::MAX), None);
    }

    #[test]
    fn seed_heights_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..32 {
            let grid = generate_random(0.0, 70.0, 0, &mut rng);
            assert!(grid.values().iter().all(|&v| (0.0..70.0).contains(&v)));
        }
    }

    #[test]
    fn displacement_is_bounded_by_error_and_rectangle_size() {
        let mut rng = StdRng::seed_from_u64(5);
        let out = generate(&HeightGrid::new(3, 3), 2.0, 0.25, &mut rng);
        // Square centres carry one offset, diamonds average offsets and add one.
        for y in (1..out.height()).step_by(2) {
            for x in (1..out.width()).step_by(2) {
                assert!(out.get(x, y).abs() <= 0.5 + 1e-6);
            }
        }
        assert!(out.values().iter().all(|v| v.abs() <= 1.0 + 1e-6));
        assert!(out.values().iter().any(|&v| v != 0.0));
    }
}
