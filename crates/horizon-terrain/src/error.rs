//! Terrain streaming errors.

use horizon_common::{ChunkKey, HorizonError};
use thiserror::Error;

/// Errors raised by the terrain cache and its generation pipeline.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// LOD index outside the supported levels
    #[error("Invalid LOD index {0} (expected 0..3)")]
    InvalidLodIndex(usize),

    /// Configuration rejected by validation
    #[error("Invalid terrain config: {0}")]
    InvalidConfig(String),

    /// A generation worker thread could not be started
    #[error("Failed to spawn generation worker for chunk {key}: {source}")]
    SpawnFailed {
        /// Chunk the worker was generating
        key: ChunkKey,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// A generation worker panicked before producing geometry
    #[error("Generation worker for chunk {key} panicked")]
    WorkerPanicked {
        /// Chunk the worker was generating
        key: ChunkKey,
    },
}

/// Result type for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;

impl From<TerrainError> for HorizonError {
    fn from(err: TerrainError) -> Self {
        Self::Terrain(err.to_string())
    }
}
