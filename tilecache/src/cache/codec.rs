//! Encoding of tiles into three-stream cache entries.
//!
//! # Entry Layout
//!
//! | Index | Content                                  |
//! |-------|------------------------------------------|
//! | 0     | raw tile payload, read to end of stream  |
//! | 1     | height, 4-byte big-endian signed integer |
//! | 2     | width, 4-byte big-endian signed integer  |
//!
//! Encoding happens entirely in memory (`StagedEntry`) before any store
//! editor is opened, so a tile that cannot be represented never starts a
//! write. Decoding treats every deviation from the layout as an error;
//! the provider turns any such error into a cache miss.

use std::io::{self, Read};

use thiserror::Error;

use crate::cache::store::Snapshot;
use crate::tile::Tile;

/// Sub-stream holding the tile payload.
pub const INDEX_DATA: usize = 0;
/// Sub-stream holding the tile height.
pub const INDEX_HEIGHT: usize = 1;
/// Sub-stream holding the tile width.
pub const INDEX_WIDTH: usize = 2;
/// Number of sub-streams in a tile entry.
pub const VALUE_COUNT: usize = 3;

/// Errors encoding or decoding a tile entry.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The entry has no reader for a required sub-stream.
    #[error("Entry is missing sub-stream {0}")]
    MissingStream(usize),

    /// A dimension stream does not hold exactly four bytes.
    #[error("Sub-stream {index} holds {len} bytes, expected 4")]
    Malformed { index: usize, len: usize },

    /// Decoded dimensions are not positive, or tile dimensions do not fit
    /// a signed 32-bit integer.
    #[error("Tile dimensions out of range: {width}×{height}")]
    DimensionsOutOfRange { width: i64, height: i64 },

    /// Reading a sub-stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A tile encoded into its sub-stream bytes, ready to hand to an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    streams: [Vec<u8>; VALUE_COUNT],
}

impl StagedEntry {
    /// Encode a tile.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::DimensionsOutOfRange` if width or height exceed
    /// `i32::MAX`.
    pub fn encode(tile: &Tile) -> Result<Self, CodecError> {
        let out_of_range = || CodecError::DimensionsOutOfRange {
            width: i64::from(tile.width()),
            height: i64::from(tile.height()),
        };
        let height = i32::try_from(tile.height()).map_err(|_| out_of_range())?;
        let width = i32::try_from(tile.width()).map_err(|_| out_of_range())?;

        let mut streams: [Vec<u8>; VALUE_COUNT] = Default::default();
        streams[INDEX_DATA] = tile.data().to_vec();
        streams[INDEX_HEIGHT] = height.to_be_bytes().to_vec();
        streams[INDEX_WIDTH] = width.to_be_bytes().to_vec();
        Ok(Self { streams })
    }

    /// Sub-streams in index order.
    pub fn streams(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.streams
            .iter()
            .enumerate()
            .map(|(index, bytes)| (index, bytes.as_slice()))
    }

    /// Total encoded size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.streams.iter().map(Vec::len).sum()
    }
}

/// Decode a tile from a snapshot, reading payload, height, then width.
pub fn decode(snapshot: &mut Snapshot) -> Result<Tile, CodecError> {
    let data = read_bytes(snapshot, INDEX_DATA)?;
    let height = read_i32(snapshot, INDEX_HEIGHT)?;
    let width = read_i32(snapshot, INDEX_WIDTH)?;

    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(CodecError::DimensionsOutOfRange {
            width: i64::from(width),
            height: i64::from(height),
        });
    };
    Tile::new(w, h, data).map_err(|_| CodecError::DimensionsOutOfRange {
        width: i64::from(width),
        height: i64::from(height),
    })
}

fn read_bytes(snapshot: &mut Snapshot, index: usize) -> Result<Vec<u8>, CodecError> {
    let capacity = snapshot.stream_len(index).unwrap_or(0) as usize;
    let mut reader = snapshot
        .take_reader(index)
        .ok_or(CodecError::MissingStream(index))?;
    let mut buf = Vec::with_capacity(capacity);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_i32(snapshot: &mut Snapshot, index: usize) -> Result<i32, CodecError> {
    let bytes = read_bytes(snapshot, index)?;
    let raw: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::Malformed {
            index,
            len: bytes.len(),
        })?;
    Ok(i32::from_be_bytes(raw))
}
