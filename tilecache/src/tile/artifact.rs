//! The cached tile artifact.

use crate::tile::TileError;

/// A generated tile: pixel dimensions plus an opaque payload.
///
/// The payload is usually compressed image data, but the cache never looks
/// inside it. Tiles are immutable once constructed.
///
/// # Example
///
/// ```
/// use tilecache::tile::Tile;
///
/// let tile = Tile::new(256, 256, vec![0x89, b'P', b'N', b'G']).unwrap();
/// assert_eq!(tile.width(), 256);
/// assert_eq!(tile.data().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Tile {
    /// Create a new tile.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidDimensions` if either dimension is zero.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, TileError> {
        if width == 0 || height == 0 {
            return Err(TileError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the tile, returning its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
