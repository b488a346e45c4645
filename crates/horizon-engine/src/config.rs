//! Engine configuration.
//!
//! Groups the terrain, generator and flythrough settings in one TOML file.
//! Configuration can be loaded from and saved to a file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use horizon_common::{ConfigError, HorizonResult};
use horizon_terrain::{NoiseParams, TerrainConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "horizon.toml";

/// Scripted camera path driven through the terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlythroughConfig {
    /// Frames to simulate
    pub frames: u32,
    /// Camera speed in world units per second
    pub speed: f32,
    /// Fixed timestep per frame in seconds
    pub dt: f32,
    /// Camera height above the terrain surface
    pub camera_height: f32,
    /// Travel direction in degrees, 0 = +X, 90 = +Z
    pub heading_degrees: f32,
    /// Downward tilt of the view direction
    pub pitch: f32,
    /// Starting X position
    pub start_x: f32,
    /// Starting Z position
    pub start_z: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Far clip distance
    pub far_plane: f32,
    /// Draw terrain as wireframe
    pub wireframe: bool,
    /// Try to create a GPU device before falling back to headless
    pub try_gpu: bool,
    /// Offscreen target width in pixels
    pub viewport_width: u32,
    /// Offscreen target height in pixels
    pub viewport_height: u32,
    /// Frames between progress logs (0 = never)
    pub log_interval: u32,
}

impl Default for FlythroughConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            speed: 60.0,
            dt: 1.0 / 60.0,
            camera_height: 30.0,
            heading_degrees: 0.0,
            pitch: 0.25,
            start_x: 0.0,
            start_z: 0.0,
            fov_degrees: 60.0,
            far_plane: 2000.0,
            wireframe: false,
            try_gpu: true,
            viewport_width: 640,
            viewport_height: 360,
            log_interval: 120,
        }
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Terrain streaming settings
    pub terrain: TerrainConfig,
    /// Noise generator settings
    pub generator: NoiseParams,
    /// Camera path settings
    pub flythrough: FlythroughConfig,
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration from a specific path, reporting any failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> HorizonResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config
            .terrain
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> HorizonResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> HorizonResult<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Clamp flythrough values to sensible ranges.
    ///
    /// Terrain values are checked by the cache itself.
    pub fn validate(&mut self) {
        let flight = &mut self.flythrough;
        flight.dt = flight.dt.clamp(1.0e-4, 1.0);
        flight.speed = flight.speed.max(0.0);
        flight.fov_degrees = flight.fov_degrees.clamp(10.0, 120.0);
        flight.far_plane = flight.far_plane.max(1.0);
        flight.viewport_width = flight.viewport_width.clamp(1, 4096);
        flight.viewport_height = flight.viewport_height.clamp(1, 4096);
    }
}
