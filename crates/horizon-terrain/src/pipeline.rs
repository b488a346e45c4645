//! Asynchronous chunk generation.
//!
//! Each request runs the generator once for one chunk at one resolution.
//! At most one request per chunk key is in flight; its record carries the
//! task handle together with the requested level, so both leave the pending
//! set together when the task is harvested.
//!
//! Harvesting polls task completion and never blocks. Only
//! [`GenerationPipeline::wait_all`] (and therefore `Drop`) joins.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use ahash::AHashMap;
use horizon_common::ChunkKey;
use tracing::{debug, warn};

use crate::config::GenerationMode;
use crate::error::{TerrainError, TerrainResult};
use crate::generator::{GeometryBuilder, SharedGenerator};
use crate::lod::LodLevel;
use crate::mesh::MeshData;

enum TaskHandle {
    Worker(JoinHandle<MeshData>),
    /// Inline result; `None` if the generator panicked.
    Completed(Option<MeshData>),
}

impl TaskHandle {
    fn is_finished(&self) -> bool {
        match self {
            Self::Worker(handle) => handle.is_finished(),
            Self::Completed(_) => true,
        }
    }

    fn join(self) -> Option<MeshData> {
        match self {
            Self::Worker(handle) => handle.join().ok(),
            Self::Completed(result) => result,
        }
    }
}

struct PendingGeneration {
    handle: TaskHandle,
    lod: LodLevel,
    orphaned: bool,
}

/// A finished generation taken out of the pipeline.
#[derive(Debug)]
pub struct HarvestedGeneration {
    /// Chunk the geometry belongs to
    pub key: ChunkKey,
    /// Level the geometry was requested for
    pub lod: LodLevel,
    /// Generated geometry
    pub mesh: MeshData,
    /// The chunk was evicted while the request was in flight
    pub orphaned: bool,
}

/// Tracks in-flight generation requests keyed by chunk.
pub struct GenerationPipeline {
    mode: GenerationMode,
    pending: AHashMap<ChunkKey, PendingGeneration>,
    submitted: u64,
}

impl GenerationPipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            pending: AHashMap::new(),
            submitted: 0,
        }
    }

    /// Execution mode.
    #[must_use]
    pub const fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Schedules generation of `key` at `lod`.
    ///
    /// Returns `Ok(false)` without scheduling anything if `key` already has a
    /// request in flight.
    pub fn request<G: GeometryBuilder>(
        &mut self,
        key: ChunkKey,
        lod: LodLevel,
        cells_per_side: u32,
        world_scale: f32,
        generator: &SharedGenerator<G>,
    ) -> TerrainResult<bool> {
        if self.pending.contains_key(&key) {
            return Ok(false);
        }

        let handle = match self.mode {
            GenerationMode::Threaded => {
                let generator = generator.clone();
                let worker = thread::Builder::new()
                    .name(format!("terrain-gen {},{} {}", key.x, key.z, lod))
                    .spawn(move || generator.generate(key.x, key.z, cells_per_side, world_scale))
                    .map_err(|source| TerrainError::SpawnFailed { key, source })?;
                TaskHandle::Worker(worker)
            }
            GenerationMode::Inline => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    generator.generate(key.x, key.z, cells_per_side, world_scale)
                }));
                TaskHandle::Completed(result.ok())
            }
        };

        self.pending.insert(
            key,
            PendingGeneration {
                handle,
                lod,
                orphaned: false,
            },
        );
        self.submitted += 1;
        debug!("Requested {} for chunk {}", lod, key);
        Ok(true)
    }

    /// Takes every completed request out of the pipeline without blocking.
    ///
    /// Requests still running are left untouched. A request whose worker
    /// panicked comes back as [`TerrainError::WorkerPanicked`] and its key is
    /// no longer pending.
    pub fn harvest(&mut self) -> Vec<TerrainResult<HarvestedGeneration>> {
        let mut ready: Vec<ChunkKey> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.handle.is_finished())
            .map(|(key, _)| *key)
            .collect();
        ready.sort_unstable_by_key(|key| (key.z, key.x));

        let mut harvested = Vec::with_capacity(ready.len());
        for key in ready {
            let Some(pending) = self.pending.remove(&key) else {
                continue;
            };
            match pending.handle.join() {
                Some(mesh) => harvested.push(Ok(HarvestedGeneration {
                    key,
                    lod: pending.lod,
                    mesh,
                    orphaned: pending.orphaned,
                })),
                None => {
                    warn!("Generation of {} for chunk {} panicked", pending.lod, key);
                    harvested.push(Err(TerrainError::WorkerPanicked { key }));
                }
            }
        }
        harvested
    }

    /// Flags an in-flight request whose chunk was evicted.
    ///
    /// Returns `false` if `key` is not pending.
    pub fn mark_orphaned(&mut self, key: ChunkKey) -> bool {
        match self.pending.get_mut(&key) {
            Some(pending) => {
                pending.orphaned = true;
                true
            }
            None => false,
        }
    }

    /// Whether a request for `key` is in flight.
    #[must_use]
    pub fn is_pending(&self, key: ChunkKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Level requested for `key`, if a request is in flight.
    #[must_use]
    pub fn requested_lod(&self, key: ChunkKey) -> Option<LodLevel> {
        self.pending.get(&key).map(|pending| pending.lod)
    }

    /// Number of requests in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total requests scheduled.
    #[must_use]
    pub const fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Joins every outstanding request and discards the results.
    ///
    /// Returns the number of requests waited for.
    pub fn wait_all(&mut self) -> usize {
        let count = self.pending.len();
        for (key, pending) in self.pending.drain() {
            if pending.handle.join().is_none() {
                warn!("Generation for chunk {} panicked during shutdown", key);
            }
        }
        count
    }
}

impl Drop for GenerationPipeline {
    fn drop(&mut self) {
        let joined = self.wait_all();
        if joined > 0 {
            debug!("Joined {} outstanding generation tasks", joined);
        }
    }
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("mode", &self.mode)
            .field("pending", &self.pending.len())
            .field("submitted", &self.submitted)
            .finish()
    }
}
