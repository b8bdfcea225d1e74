//! Tile generation request types.

/// Request to generate a tile.
///
/// Coordinates are signed so that any integer grid a generator supports
/// can be addressed, including negative offsets.
///
/// # Example
///
/// ```
/// use tilecache::tile::TileRequest;
///
/// let request = TileRequest::new(3, 5, 10);
/// assert_eq!(request.x(), 3);
/// assert_eq!(request.y(), 5);
/// assert_eq!(request.zoom(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Tile column
    x: i32,
    /// Tile row
    y: i32,
    /// Zoom level
    zoom: i32,
}

impl TileRequest {
    /// Create a new tile request.
    pub fn new(x: i32, y: i32, zoom: i32) -> Self {
        Self { x, y, zoom }
    }

    /// Get the tile column.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Get the tile row.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Get the zoom level.
    pub fn zoom(&self) -> i32 {
        self.zoom
    }
}

impl From<(i32, i32, i32)> for TileRequest {
    fn from((x, y, zoom): (i32, i32, i32)) -> Self {
        Self::new(x, y, zoom)
    }
}
