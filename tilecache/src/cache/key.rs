//! Cache key derivation.
//!
//! # Key Format
//!
//! Keys follow the format `{x}_{y}_{zoom}_{tag}`, e.g. `3_5_10_mapA`.
//!
//! Coordinates render as (optionally signed) decimal integers, which never
//! contain `_`. The tag is always the suffix after the third `_`, so two
//! different `(x, y, zoom, tag)` tuples can never produce the same key.
//! Tags are restricted to `[A-Za-z0-9_-]`, which keeps every key safe to use
//! as a file name.

use std::fmt;

use thiserror::Error;

/// Maximum tag length in characters.
pub const MAX_TAG_LEN: usize = 64;

/// Errors validating a cache namespace tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Tag is empty, too long, or contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid cache tag '{tag}': expected 1-{max} characters from [A-Za-z0-9_-]", max = MAX_TAG_LEN)]
    InvalidTag { tag: String },
}

/// Namespace tag separating entries of providers that share one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileTag(String);

impl TileTag {
    /// Validate and wrap a tag.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidTag` if the tag is empty, longer than
    /// [`MAX_TAG_LEN`], or contains characters other than ASCII letters,
    /// digits, `_` or `-`.
    pub fn new(tag: impl Into<String>) -> Result<Self, KeyError> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && tag.len() <= MAX_TAG_LEN
            && tag
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(tag))
        } else {
            Err(KeyError::InvalidTag { tag })
        }
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store key identifying one tile's cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a tile coordinate within a namespace.
    pub fn new(x: i32, y: i32, zoom: i32, tag: &TileTag) -> Self {
        Self(format!("{}_{}_{}_{}", x, y, zoom, tag))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
