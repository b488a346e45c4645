//! Terrain streaming configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::lod::{LodLevel, DEFAULT_LOD_DISTANCES, DEFAULT_LOD_RESOLUTIONS, LOD_COUNT};

/// Default radius (in chunks) of the generation window around the viewer.
pub const DEFAULT_GENERATE_RADIUS: i32 = 16;

/// Default distance beyond which resident chunks are evicted.
pub const DEFAULT_UNLOAD_DISTANCE: f32 = 1500.0;

/// Default viewer movement below which updates may be skipped.
pub const DEFAULT_MIN_MOVE_DISTANCE: f32 = 20.0;

/// Default number of frames an update may be deferred for.
pub const DEFAULT_UPDATE_INTERVAL: u32 = 8;

/// Maximum new generation requests issued per full update.
pub const MAX_REQUESTS_PER_FRAME: usize = 8;

/// How generation requests are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Each request runs on its own worker thread.
    #[default]
    Threaded,
    /// Requests run on the calling thread at submission; results are held
    /// until the next harvest.
    Inline,
}

/// What to do with a result whose chunk was evicted while it was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResultPolicy {
    /// Recreate the chunk from the result. If it is still beyond the unload
    /// distance the eviction step of the same update removes it again.
    #[default]
    Recreate,
    /// Drop the result without touching the cache.
    Discard,
}

/// Configuration for the terrain cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Radius (in chunks) of the square window generated around the viewer
    pub generate_radius: i32,
    /// World units per grid cell
    pub world_scale: f32,
    /// Cells per side for each LOD, finest first
    pub lod_resolutions: [u32; LOD_COUNT],
    /// Distance thresholds between consecutive LODs
    pub lod_distances: [f32; LOD_COUNT - 1],
    /// Chunks whose centre is further than this are evicted
    pub unload_distance: f32,
    /// Movement below which an update may be skipped
    pub min_move_distance: f32,
    /// Frames an update may be skipped for when the viewer barely moves
    pub update_interval: u32,
    /// Cap on new generation requests per full update
    pub max_requests_per_frame: usize,
    /// Worker threads or inline execution
    pub generation_mode: GenerationMode,
    /// Handling of results for chunks evicted while in flight
    pub stale_results: StaleResultPolicy,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            generate_radius: DEFAULT_GENERATE_RADIUS,
            world_scale: 1.0,
            lod_resolutions: DEFAULT_LOD_RESOLUTIONS,
            lod_distances: DEFAULT_LOD_DISTANCES,
            unload_distance: DEFAULT_UNLOAD_DISTANCE,
            min_move_distance: DEFAULT_MIN_MOVE_DISTANCE,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            max_requests_per_frame: MAX_REQUESTS_PER_FRAME,
            generation_mode: GenerationMode::default(),
            stale_results: StaleResultPolicy::default(),
        }
    }
}

impl TerrainConfig {
    /// Creates a config with a custom generation radius.
    #[must_use]
    pub fn with_radius(generate_radius: i32) -> Self {
        Self {
            generate_radius,
            ..Default::default()
        }
    }

    /// Side length of a chunk in world units, fixed by the finest LOD.
    #[must_use]
    pub fn chunk_world_size(&self) -> f32 {
        (self.lod_resolutions[0] - 1) as f32 * self.world_scale
    }

    /// Cells per side generated for the given level.
    #[must_use]
    pub fn resolution(&self, level: LodLevel) -> u32 {
        self.lod_resolutions[level.index()]
    }

    /// Desired level for a viewer at `distance` from a chunk centre.
    #[must_use]
    pub fn lod_for_distance(&self, distance: f32) -> LodLevel {
        LodLevel::for_distance(distance, &self.lod_distances)
    }

    /// Checks that the values describe a usable cache.
    pub fn validate(&self) -> TerrainResult<()> {
        if self.generate_radius < 0 {
            return Err(TerrainError::InvalidConfig(format!(
                "generate_radius must be >= 0, got {}",
                self.generate_radius
            )));
        }
        if self.world_scale.is_nan() || self.world_scale <= 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "world_scale must be positive, got {}",
                self.world_scale
            )));
        }
        if self.lod_resolutions.iter().any(|&cells| cells < 2) {
            return Err(TerrainError::InvalidConfig(
                "every LOD needs at least 2 cells per side".into(),
            ));
        }
        if self.lod_resolutions.windows(2).any(|w| w[0] <= w[1]) {
            return Err(TerrainError::InvalidConfig(format!(
                "LOD resolutions must strictly decrease, got {:?}",
                self.lod_resolutions
            )));
        }
        if self.lod_distances[0] <= 0.0 || self.lod_distances[0] >= self.lod_distances[1] {
            return Err(TerrainError::InvalidConfig(format!(
                "LOD distances must be positive and increasing, got {:?}",
                self.lod_distances
            )));
        }
        if self.unload_distance.is_nan() || self.unload_distance <= 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "unload_distance must be positive, got {}",
                self.unload_distance
            )));
        }
        if self.min_move_distance < 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "min_move_distance must be >= 0, got {}",
                self.min_move_distance
            )));
        }
        if self.max_requests_per_frame == 0 {
            return Err(TerrainError::InvalidConfig(
                "max_requests_per_frame must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_config_default() {
        let config = TerrainConfig::default();
        assert_eq!(config.generate_radius, DEFAULT_GENERATE_RADIUS);
        assert_eq!(config.unload_distance, 1500.0);
        assert_eq!(config.min_move_distance, 20.0);
        assert_eq!(config.update_interval, 8);
        assert_eq!(config.max_requests_per_frame, 8);
        assert_eq!(config.lod_resolutions, [65, 33, 17]);
        assert_eq!(config.chunk_world_size(), 64.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolution_per_level() {
        let config = TerrainConfig::with_radius(2);
        assert_eq!(config.generate_radius, 2);
        assert_eq!(config.resolution(LodLevel::High), 65);
        assert_eq!(config.resolution(LodLevel::Medium), 33);
        assert_eq!(config.resolution(LodLevel::Low), 17);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TerrainConfig {
                generate_radius: -1,
                ..Default::default()
            },
            TerrainConfig {
                world_scale: 0.0,
                ..Default::default()
            },
            TerrainConfig {
                lod_resolutions: [33, 33, 17],
                ..Default::default()
            },
            TerrainConfig {
                lod_resolutions: [65, 33, 1],
                ..Default::default()
            },
            TerrainConfig {
                lod_distances: [300.0, 150.0],
                ..Default::default()
            },
            TerrainConfig {
                max_requests_per_frame: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(TerrainError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TerrainConfig = toml::from_str(
            "generate_radius = 3\ngeneration_mode = \"inline\"\nstale_results = \"discard\"\n",
        )
        .expect("parse failed");
        assert_eq!(config.generate_radius, 3);
        assert_eq!(config.generation_mode, GenerationMode::Inline);
        assert_eq!(config.stale_results, StaleResultPolicy::Discard);
        assert_eq!(config.unload_distance, DEFAULT_UNLOAD_DISTANCE);
    }
}
