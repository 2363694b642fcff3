use crate::error::TerrainError;

/// Row-major 2D array of elevations.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl HeightGrid {
    /// Zero-initialized grid of `width * height` samples.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Result<Self, TerrainError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(TerrainError::GridShape {
                width,
                height,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "height grid access ({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        x as usize + y as usize * self.width as usize
    }

    /// Panics if `(x, y)` lies outside the grid.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[self.index(x, y)]
    }

    /// Panics if `(x, y)` lies outside the grid.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let i = self.index(x, y);
        self.values[i] = value;
    }

    /// Lowest and highest sample, or `None` for an empty grid.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.values.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}
