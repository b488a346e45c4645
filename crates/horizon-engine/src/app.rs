//! Headless flythrough over the streaming terrain.
//!
//! Moves a camera along a straight heading at a fixed height above the
//! ground, updating and drawing the terrain cache every frame.

use std::time::Instant;

use anyhow::Result;
use glam::{Mat4, Vec3};
use horizon_common::ChunkKey;
use horizon_terrain::{
    CountingBackend, Frustum, GeometryBuilder, NoiseTerrainGenerator, RenderBackend, TerrainCache,
    TerrainStats, WgpuBackend,
};
use tracing::{info, warn};

use crate::config::{EngineConfig, FlythroughConfig};
use crate::renderer::OffscreenRenderer;

/// Totals gathered over a flythrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightSummary {
    /// Frames simulated
    pub frames: u32,
    /// Chunk draws issued over all frames
    pub chunks_drawn: usize,
    /// Chunks culled over all frames
    pub chunks_culled: usize,
    /// Camera position after the last frame
    pub final_position: Vec3,
    /// Chunk under the camera after the last frame
    pub final_chunk: ChunkKey,
    /// Cache counters after the last frame
    pub stats: TerrainStats,
}

/// Runs the flythrough described by `config`.
///
/// Uses an offscreen GPU renderer when one can be created, otherwise the
/// counting backend.
pub fn run(config: &EngineConfig) -> Result<FlightSummary> {
    let flight = &config.flythrough;
    let generator = NoiseTerrainGenerator::new(config.generator.clone())
        .with_base_cells(config.terrain.lod_resolutions[0]);

    if flight.try_gpu {
        match pollster::block_on(OffscreenRenderer::new(
            flight.viewport_width,
            flight.viewport_height,
        )) {
            Ok(mut renderer) => {
                let backend = WgpuBackend::new(renderer.device());
                let mut cache = TerrainCache::new(config.terrain.clone(), generator, backend)?;
                let summary = fly(flight, &mut cache, |backend, view_proj| {
                    renderer.render(backend, view_proj);
                });
                info!("Submitted {} GPU frames", renderer.frame_count());
                return Ok(summary);
            },
            Err(e) => warn!("GPU unavailable, running headless: {e:#}"),
        }
    }

    let mut cache = TerrainCache::new(config.terrain.clone(), generator, CountingBackend::new())?;
    let summary = fly(flight, &mut cache, |backend, _| backend.begin_frame());
    info!(
        "Headless backend: {} uploads, {} draws, {} meshes live",
        cache.backend().uploads(),
        cache.backend().draws(),
        cache.backend().live_meshes()
    );
    Ok(summary)
}

/// Flies the camera through `cache`, calling `present` once per frame after
/// the terrain has been drawn.
pub fn fly<G, B>(
    flight: &FlythroughConfig,
    cache: &mut TerrainCache<G, B>,
    mut present: impl FnMut(&mut B, Mat4),
) -> FlightSummary
where
    G: GeometryBuilder,
    B: RenderBackend,
{
    let heading = flight.heading_degrees.to_radians();
    let direction = Vec3::new(heading.cos(), 0.0, heading.sin());
    let look = Vec3::new(direction.x, -flight.pitch, direction.z).normalize_or_zero();
    let aspect = flight.viewport_width.max(1) as f32 / flight.viewport_height.max(1) as f32;
    let projection =
        Mat4::perspective_rh(flight.fov_degrees.to_radians(), aspect, 0.1, flight.far_plane);

    let mut position = Vec3::new(flight.start_x, 0.0, flight.start_z);
    position.y = cache.height_at(position.x, position.z) + flight.camera_height;

    let start = Instant::now();
    let initial = cache.generate_initial_terrain(position);
    info!(
        "Generated {} initial chunks in {:.2?}",
        initial,
        start.elapsed()
    );

    let mut summary = FlightSummary::default();
    let start = Instant::now();
    for frame in 1..=flight.frames {
        position += direction * flight.speed * flight.dt;
        position.y = cache.height_at(position.x, position.z) + flight.camera_height;

        cache.update(flight.dt, position);

        let view_proj = projection * Mat4::look_at_rh(position, position + look, Vec3::Y);
        let frustum = Frustum::from_view_projection(view_proj);
        let report = cache.draw(&frustum, position, flight.wireframe);
        present(cache.backend_mut(), view_proj);

        summary.frames = frame;
        summary.chunks_drawn += report.drawn;
        summary.chunks_culled += report.culled;

        if flight.log_interval > 0 && frame % flight.log_interval == 0 {
            let stats = cache.stats();
            info!(
                "Frame {}: position ({:.0}, {:.0}), {} resident, {} pending, drew {} culled {}",
                frame,
                position.x,
                position.z,
                stats.resident_chunks,
                stats.pending_requests,
                report.drawn,
                report.culled
            );
        }
    }

    summary.final_position = position;
    summary.final_chunk = cache.world_to_chunk(position.x, position.z);
    summary.stats = cache.stats();

    info!(
        "Flythrough finished: {} frames in {:.2?}, {} resident chunks, {} requests, {} evictions",
        summary.frames,
        start.elapsed(),
        summary.stats.resident_chunks,
        summary.stats.requests_issued,
        summary.stats.chunks_evicted
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_terrain::{GenerationMode, TerrainConfig};

    fn test_config() -> EngineConfig {
        EngineConfig {
            terrain: TerrainConfig {
                generate_radius: 1,
                generation_mode: GenerationMode::Inline,
                ..Default::default()
            },
            flythrough: FlythroughConfig {
                frames: 30,
                speed: 100.0,
                dt: 0.1,
                try_gpu: false,
                log_interval: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_flythrough_moves_along_heading() {
        let config = test_config();
        let mut cache = TerrainCache::new(
            config.terrain.clone(),
            NoiseTerrainGenerator::new(config.generator.clone()),
            CountingBackend::new(),
        )
        .expect("valid config");

        let mut presented = 0;
        let summary = fly(&config.flythrough, &mut cache, |backend, _| {
            presented += 1;
            backend.begin_frame();
        });

        assert_eq!(summary.frames, 30);
        assert_eq!(presented, 30);
        assert!((summary.final_position.x - 300.0).abs() < 1e-2);
        assert!(summary.final_position.z.abs() < 1e-3);
        assert_eq!(summary.final_chunk, ChunkKey::new(4, 0));
        assert!(summary.chunks_drawn > 0);
        assert!(summary.stats.full_updates > 0);
        assert!(summary.stats.requests_issued > 0);
    }

    #[test]
    fn test_camera_follows_ground() {
        let config = test_config();
        let mut cache = TerrainCache::new(
            config.terrain.clone(),
            NoiseTerrainGenerator::new(config.generator.clone()),
            CountingBackend::new(),
        )
        .expect("valid config");

        let summary = fly(&config.flythrough, &mut cache, |_, _| {});
        let ground = cache.height_at(summary.final_position.x, summary.final_position.z);
        let height = summary.final_position.y - ground;
        assert!((height - config.flythrough.camera_height).abs() < 1e-3);
    }

    #[test]
    fn test_run_headless() {
        let summary = run(&test_config()).expect("run failed");
        assert_eq!(summary.frames, 30);
        assert!(summary.stats.resident_chunks > 0);
    }
}
