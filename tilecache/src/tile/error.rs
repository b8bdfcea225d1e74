//! Error types for tiles and tile generation.

use thiserror::Error;

/// Errors constructing a `Tile`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// Width and height must both be positive.
    #[error("Invalid tile dimensions {width}×{height}: both must be positive")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Errors reported by a `TileGenerator`.
///
/// The cache layer never produces these itself; they are passed through to
/// the caller unchanged.
#[derive(Debug, Error)]
pub enum TileGeneratorError {
    /// The requested coordinates are outside the generator's domain.
    #[error("Invalid coordinates x={x} y={y} zoom={zoom}")]
    InvalidCoordinates { x: i32, y: i32, zoom: i32 },

    /// The generator produced an unusable tile.
    #[error(transparent)]
    InvalidTile(#[from] TileError),

    /// Generation failed for a generator-specific reason.
    #[error("Tile generation failed: {0}")]
    GenerationFailed(String),
}
