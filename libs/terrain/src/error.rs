use thiserror::Error;

/// Largest vertex count addressable by a 16-bit index buffer.
pub const MAX_MESH_VERTICES: usize = u16::MAX as usize + 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TerrainError {
    #[error("height grid {width}x{height} needs {expected} values but got {actual}")]
    GridShape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error(
        "mesh window at ({x}, {z}) spanning {count_x}x{count_z} vertices exceeds the {size_x}x{size_z} surface"
    )]
    WindowOutOfBounds {
        x: u32,
        z: u32,
        count_x: u32,
        count_z: u32,
        size_x: u32,
        size_z: u32,
    },
    #[error("mesh window spanning {count_x}x{count_z} vertices has no quads")]
    WindowTooSmall { count_x: u32, count_z: u32 },
    #[error("mesh window has {vertices} vertices but 16-bit indices address at most {max}")]
    IndexCapacity { vertices: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config ron: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}
