//! TileGenerator trait for abstracting tile generation strategies.
//!
//! # Example
//!
//! ```
//! use tilecache::tile::{Tile, TileGenerator, TileGeneratorError, TileRequest};
//!
//! struct Blank;
//!
//! impl TileGenerator for Blank {
//!     fn generate(&self, _request: &TileRequest) -> Result<Tile, TileGeneratorError> {
//!         Ok(Tile::new(256, 256, vec![0; 16])?)
//!     }
//! }
//!
//! let tile = Blank.generate(&TileRequest::new(3, 5, 10)).unwrap();
//! assert_eq!(tile.height(), 256);
//! ```

use crate::tile::{Tile, TileGeneratorError, TileRequest};

/// Trait for tile generation strategies.
///
/// Implementations are expected to be deterministic: the same request
/// always yields the same tile. That is what makes caching the output
/// safe. Implementations must be thread-safe (`Send + Sync`) because a
/// provider may be shared across rendering threads.
pub trait TileGenerator: Send + Sync {
    /// Generate the tile for the given request.
    ///
    /// # Errors
    ///
    /// Returns `TileGeneratorError` if the tile cannot be produced. The
    /// cache layer propagates this error to its caller unchanged.
    fn generate(&self, request: &TileRequest) -> Result<Tile, TileGeneratorError>;
}
