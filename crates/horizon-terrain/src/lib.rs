//! # Horizon Terrain
//!
//! Streaming heightfield terrain for Horizon.
//!
//! This crate handles:
//! - Chunk cache with distance-based eviction
//! - Asynchronous chunk generation behind a shared generator lock
//! - Three levels of detail per chunk with fallback draw
//! - Frustum culling and pluggable render backends

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod bounds;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod error;
pub mod frustum;
pub mod generator;
pub mod gpu;
pub mod lod;
pub mod mesh;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::bounds::*;
    pub use crate::cache::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::frustum::*;
    pub use crate::generator::*;
    pub use crate::gpu::*;
    pub use crate::lod::*;
    pub use crate::mesh::*;
    pub use crate::pipeline::*;
}

pub use prelude::*;
