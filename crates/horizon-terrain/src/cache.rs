//! Chunk cache streaming terrain around a moving viewpoint.
//!
//! Each frame [`TerrainCache::update`] runs, in order:
//!
//! 1. **Harvest**: completed generations are uploaded and installed,
//!    creating chunks that are not resident yet.
//! 2. **Request**: the square window around the viewer is scanned row by
//!    row and up to `max_requests_per_frame` missing levels are requested.
//! 3. **Evict**: chunks whose centre is further than `unload_distance` are
//!    dropped together with their GPU meshes.
//!
//! Updates are debounced: while the viewer moves less than
//! `min_move_distance`, up to `update_interval` consecutive calls return
//! immediately. [`TerrainCache::draw`] is independent of the debounce and
//! picks a level per chunk every frame.

use ahash::AHashMap;
use glam::Vec3;
use horizon_common::ChunkKey;
use tracing::{debug, info, trace, warn};

use crate::backend::RenderBackend;
use crate::chunk::Chunk;
use crate::config::{StaleResultPolicy, TerrainConfig};
use crate::error::{TerrainError, TerrainResult};
use crate::frustum::{is_visible, Frustum};
use crate::generator::{GeometryBuilder, SharedGenerator};
use crate::lod::LodLevel;
use crate::pipeline::GenerationPipeline;

/// Counters describing the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainStats {
    /// Chunks currently resident
    pub resident_chunks: usize,
    /// Generation requests in flight
    pub pending_requests: usize,
    /// Generation requests issued
    pub requests_issued: u64,
    /// Results installed into chunks
    pub results_harvested: u64,
    /// Chunks evicted
    pub chunks_evicted: u64,
    /// Results dropped because their chunk had been evicted
    pub results_discarded: u64,
    /// Requests that failed to spawn or panicked
    pub generation_failures: u64,
    /// Updates that ran the harvest/request/evict cycle
    pub full_updates: u64,
    /// Updates skipped by the debounce
    pub skipped_updates: u64,
}

/// Outcome of one [`TerrainCache::draw`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    /// Chunks drawn
    pub drawn: usize,
    /// Chunks rejected by the frustum test
    pub culled: usize,
    /// Resident chunks with no ready level
    pub empty: usize,
}

/// Owner of all resident terrain chunks.
pub struct TerrainCache<G: GeometryBuilder, B: RenderBackend> {
    config: TerrainConfig,
    generator: SharedGenerator<G>,
    backend: B,
    chunks: AHashMap<ChunkKey, Chunk<B::Mesh>>,
    pipeline: GenerationPipeline,
    last_viewpoint: Vec3,
    frames_since_update: u32,
    first_update: bool,
    stats: TerrainStats,
}

impl<G: GeometryBuilder, B: RenderBackend> TerrainCache<G, B> {
    /// Creates an empty cache.
    pub fn new(config: TerrainConfig, generator: G, backend: B) -> TerrainResult<Self> {
        Self::with_shared_generator(config, SharedGenerator::new(generator), backend)
    }

    /// Creates an empty cache using an existing generator handle.
    pub fn with_shared_generator(
        config: TerrainConfig,
        generator: SharedGenerator<G>,
        backend: B,
    ) -> TerrainResult<Self> {
        config.validate()?;
        if let Some(cells) = generator.base_cells() {
            if cells != config.lod_resolutions[0] {
                return Err(TerrainError::InvalidConfig(format!(
                    "generator spans {} cells per side but the finest LOD has {}",
                    cells, config.lod_resolutions[0]
                )));
            }
        }
        info!(
            "Terrain cache created: radius {}, chunk size {}, unload distance {}, {:?} generation",
            config.generate_radius,
            config.chunk_world_size(),
            config.unload_distance,
            config.generation_mode
        );
        Ok(Self {
            pipeline: GenerationPipeline::new(config.generation_mode),
            config,
            generator,
            backend,
            chunks: AHashMap::new(),
            last_viewpoint: Vec3::ZERO,
            frames_since_update: 0,
            first_update: true,
            stats: TerrainStats::default(),
        })
    }

    /// Synchronously generates the full window around `viewpoint` at the
    /// finest level.
    ///
    /// Blocks until every chunk is built. Returns the number of chunks
    /// generated.
    pub fn generate_initial_terrain(&mut self, viewpoint: Vec3) -> usize {
        let center = self.world_to_chunk(viewpoint.x, viewpoint.z);
        let cells = self.config.resolution(LodLevel::High);
        let mut generated = 0;

        for key in center.window(self.config.generate_radius) {
            let chunk = self.chunks.entry(key).or_insert_with(|| {
                Chunk::new(key, self.config.lod_resolutions[0], self.config.world_scale)
            });
            chunk.regenerate(LodLevel::High, cells, &self.generator, &mut self.backend);
            generated += 1;
        }

        info!(
            "Initial terrain generated: {} chunks around {}",
            generated, center
        );
        generated
    }

    /// Advances streaming for one frame.
    pub fn update(&mut self, _dt: f32, viewpoint: Vec3) {
        if self.first_update {
            self.first_update = false;
        } else {
            let moved = viewpoint.distance(self.last_viewpoint);
            let frames = self.frames_since_update;
            self.frames_since_update = self.frames_since_update.saturating_add(1);
            if frames < self.config.update_interval && moved < self.config.min_move_distance {
                self.stats.skipped_updates += 1;
                trace!("Skipped terrain update ({} frames, moved {:.2})", frames, moved);
                return;
            }
        }
        self.last_viewpoint = viewpoint;
        self.frames_since_update = 0;
        self.stats.full_updates += 1;

        self.finalize_ready();
        self.request_window(viewpoint);
        self.evict_distant(viewpoint);
    }

    /// Draws every resident chunk at its distance level, falling back to the
    /// finest ready level and skipping chunks outside `frustum`.
    pub fn draw(&mut self, frustum: &Frustum, viewpoint: Vec3, wireframe: bool) -> DrawReport {
        let mut report = DrawReport::default();

        for chunk in self.chunks.values() {
            let desired = self.config.lod_for_distance(chunk.center().distance(viewpoint));
            let Some(level) = chunk.resolve(desired) else {
                report.empty += 1;
                continue;
            };
            let Some(bounds) = chunk.bounds(level) else {
                report.empty += 1;
                continue;
            };
            if !is_visible(&bounds, frustum) {
                report.culled += 1;
                continue;
            }
            if chunk.draw(level, wireframe, &mut self.backend).is_some() {
                report.drawn += 1;
            }
        }

        report
    }

    /// Requests generation of `key` at `lod`.
    ///
    /// Returns `Ok(false)` if the key already has a request in flight.
    pub fn request_async(&mut self, key: ChunkKey, lod: LodLevel) -> TerrainResult<bool> {
        let issued = self.pipeline.request(
            key,
            lod,
            self.config.resolution(lod),
            self.config.world_scale,
            &self.generator,
        )?;
        if issued {
            self.stats.requests_issued += 1;
        }
        Ok(issued)
    }

    /// Installs every completed generation without blocking.
    ///
    /// Returns the number of levels installed.
    pub fn finalize_ready(&mut self) -> usize {
        let mut installed = 0;

        for result in self.pipeline.harvest() {
            let harvested = match result {
                Ok(harvested) => harvested,
                Err(err) => {
                    self.stats.generation_failures += 1;
                    debug!("Dropped failed generation: {}", err);
                    continue;
                }
            };

            let key = harvested.key;
            if harvested.orphaned
                && self.config.stale_results == StaleResultPolicy::Discard
                && !self.chunks.contains_key(&key)
            {
                self.stats.results_discarded += 1;
                debug!("Discarded {} for evicted chunk {}", harvested.lod, key);
                continue;
            }

            let chunk = self.chunks.entry(key).or_insert_with(|| {
                Chunk::new(key, self.config.lod_resolutions[0], self.config.world_scale)
            });
            chunk.build_lod_from_data(harvested.mesh, harvested.lod, &mut self.backend);
            self.stats.results_harvested += 1;
            installed += 1;
            debug!("Installed {} for chunk {}", harvested.lod, key);
        }

        installed
    }

    /// Synchronously regenerates the finest level of every resident chunk
    /// within `radius` chunks of `center`.
    ///
    /// Returns the number of chunks regenerated.
    pub fn regenerate_around(&mut self, center: ChunkKey, radius: i32) -> usize {
        let cells = self.config.resolution(LodLevel::High);
        let mut regenerated = 0;

        for key in center.window(radius) {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.regenerate(LodLevel::High, cells, &self.generator, &mut self.backend);
                regenerated += 1;
            }
        }

        debug!("Regenerated {} chunks around {}", regenerated, center);
        regenerated
    }

    fn request_window(&mut self, viewpoint: Vec3) {
        let center = self.world_to_chunk(viewpoint.x, viewpoint.z);
        let chunk_size = self.chunk_world_size();
        let budget = self.config.max_requests_per_frame;
        let mut issued = 0;

        for key in center.window(self.config.generate_radius) {
            if issued >= budget {
                break;
            }
            if self.pipeline.is_pending(key) {
                continue;
            }

            // Keys past the unload distance would be evicted by this same update.
            let distance = key.world_center(chunk_size).distance(viewpoint);
            if distance > self.config.unload_distance {
                continue;
            }

            let desired = self.config.lod_for_distance(distance);
            if self
                .chunks
                .get(&key)
                .is_some_and(|chunk| chunk.is_ready(desired))
            {
                continue;
            }

            match self.request_async(key, desired) {
                Ok(true) => issued += 1,
                Ok(false) => {}
                Err(err) => {
                    self.stats.generation_failures += 1;
                    warn!("Failed to request chunk {}: {}", key, err);
                }
            }
        }

        if issued > 0 {
            debug!("Issued {} generation requests around {}", issued, center);
        }
    }

    fn evict_distant(&mut self, viewpoint: Vec3) {
        let chunk_size = self.chunk_world_size();
        let unload = self.config.unload_distance;
        let distant: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| key.world_center(chunk_size).distance(viewpoint) > unload)
            .copied()
            .collect();

        for key in distant {
            self.chunks.remove(&key);
            self.stats.chunks_evicted += 1;
            if self.pipeline.mark_orphaned(key) {
                debug!("Evicted chunk {} with a request in flight", key);
            } else {
                debug!("Evicted chunk {}", key);
            }
        }
    }

    /// Resident chunk at `(chunk_x, chunk_z)`.
    #[must_use]
    pub fn get_chunk(&self, chunk_x: i32, chunk_z: i32) -> Option<&Chunk<B::Mesh>> {
        self.chunks.get(&ChunkKey::new(chunk_x, chunk_z))
    }

    /// Chunk containing a world position.
    #[must_use]
    pub fn world_to_chunk(&self, world_x: f32, world_z: f32) -> ChunkKey {
        ChunkKey::from_world(world_x, world_z, self.chunk_world_size())
    }

    /// Centre of a chunk at `y = 0`.
    #[must_use]
    pub fn chunk_center(&self, key: ChunkKey) -> Vec3 {
        key.world_center(self.chunk_world_size())
    }

    /// Level selected for a viewer at `distance` from a chunk centre.
    #[must_use]
    pub fn lod_for_distance(&self, distance: f32) -> LodLevel {
        self.config.lod_for_distance(distance)
    }

    /// Side length of a chunk in world units.
    #[must_use]
    pub fn chunk_world_size(&self) -> f32 {
        self.config.chunk_world_size()
    }

    /// Terrain height at a world position.
    #[must_use]
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        self.generator.height_at(world_x, world_z)
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> TerrainStats {
        TerrainStats {
            resident_chunks: self.chunks.len(),
            pending_requests: self.pipeline.pending_count(),
            ..self.stats
        }
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of requests in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pipeline.pending_count()
    }

    /// Whether `key` has a request in flight.
    #[must_use]
    pub fn is_pending(&self, key: ChunkKey) -> bool {
        self.pipeline.is_pending(key)
    }

    /// Iterates the resident chunk keys.
    pub fn resident_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Render backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable render backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Shared generator handle.
    #[must_use]
    pub fn generator(&self) -> &SharedGenerator<G> {
        &self.generator
    }
}

impl<G: GeometryBuilder, B: RenderBackend> Drop for TerrainCache<G, B> {
    fn drop(&mut self) {
        let joined = self.pipeline.wait_all();
        info!(
            "Terrain cache shut down: {} chunks released, {} pending requests joined",
            self.chunks.len(),
            joined
        );
    }
}

impl<G: GeometryBuilder, B: RenderBackend> std::fmt::Debug for TerrainCache<G, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainCache")
            .field("config", &self.config)
            .field("chunks", &self.chunks.len())
            .field("pipeline", &self.pipeline)
            .field("stats", &self.stats)
            .finish()
    }
}
