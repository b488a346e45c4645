//! # Horizon Common
//!
//! Common types and shared abstractions for the Horizon terrain streamer.
//!
//! This crate provides foundational types used across all Horizon crates:
//! - Chunk keys and world/chunk coordinate conversion
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: HorizonError = ConfigError::Invalid("radius".into()).into();
        assert_eq!(err.to_string(), "Config error: Invalid config value: radius");
    }
}
