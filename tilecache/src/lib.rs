//! tilecache - Persistent caching for expensive tile generators
//!
//! This library places a disk-backed, transactional cache in front of any
//! deterministic tile generator. Tiles are addressed by `(x, y, zoom)` plus
//! a namespace tag; cached tiles are served without calling the generator,
//! and any cache failure falls back to generating the tile.
//!
//! # Modules
//!
//! - [`tile`]: tile value types and the `TileGenerator` trait
//! - [`cache`]: the caching provider, entry codec and stores
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod cache;
pub mod config;
pub mod logging;
pub mod tile;
