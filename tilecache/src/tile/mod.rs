//! Tile generation abstraction layer.
//!
//! This module provides the `TileGenerator` trait and the value types that
//! flow through it. The cache layer depends only on the trait, so any
//! expensive, deterministic tile source can sit behind it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CachedTileProvider                         │
//! │              (depends on Arc<dyn TileGenerator>)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TileGenerator Trait                       │
//! │              generate(&TileRequest) -> Tile                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod artifact;
mod error;
mod generator;
mod request;

pub use artifact::Tile;
pub use error::{TileError, TileGeneratorError};
pub use generator::TileGenerator;
pub use request::TileRequest;
