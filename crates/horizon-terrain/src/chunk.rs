//! One terrain cell holding up to [`LOD_COUNT`] resolutions.
//!
//! Readiness is derived from storage: a level is ready exactly when its slot
//! holds a [`LevelOfDetail`]. Replacing a level drops the previous record,
//! which releases its GPU mesh.

use glam::Vec3;
use horizon_common::ChunkKey;
use tracing::debug;

use crate::backend::{PolygonMode, RenderBackend};
use crate::bounds::Aabb;
use crate::generator::{GeometryBuilder, SharedGenerator};
use crate::lod::{LodLevel, LOD_COUNT};
use crate::mesh::MeshData;

/// Geometry, GPU mesh and bounds of one chunk at one resolution.
#[derive(Debug)]
pub struct LevelOfDetail<M> {
    mesh: MeshData,
    gpu: M,
    bounds: Aabb,
}

impl<M> LevelOfDetail<M> {
    /// CPU-side geometry.
    #[must_use]
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    /// Uploaded GPU mesh.
    #[must_use]
    pub fn gpu(&self) -> &M {
        &self.gpu
    }

    /// Bounds computed from the geometry.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// A terrain cell and its levels of detail.
#[derive(Debug)]
pub struct Chunk<M> {
    key: ChunkKey,
    base_cells: u32,
    world_scale: f32,
    levels: [Option<LevelOfDetail<M>>; LOD_COUNT],
}

impl<M> Chunk<M> {
    /// Creates an empty chunk. `base_cells` is the finest resolution, which
    /// fixes the chunk's world extent.
    #[must_use]
    pub fn new(key: ChunkKey, base_cells: u32, world_scale: f32) -> Self {
        Self {
            key,
            base_cells,
            world_scale,
            levels: [None, None, None],
        }
    }

    /// Grid cell of this chunk.
    #[must_use]
    pub const fn key(&self) -> ChunkKey {
        self.key
    }

    /// Side length in world units.
    #[must_use]
    pub fn world_size(&self) -> f32 {
        (self.base_cells.max(2) - 1) as f32 * self.world_scale
    }

    /// Centre of the chunk footprint at `y = 0`.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.key.world_center(self.world_size())
    }

    /// Installs geometry at `level`, replacing and releasing any previous
    /// record.
    pub fn build_lod_from_data<B>(&mut self, mesh: MeshData, level: LodLevel, backend: &mut B)
    where
        B: RenderBackend<Mesh = M>,
    {
        let gpu = backend.upload(&mesh);
        let bounds = Aabb::from_mesh(&mesh);
        let previous = self.levels[level.index()].replace(LevelOfDetail { mesh, gpu, bounds });
        if previous.is_some() {
            debug!("Replaced {} of chunk {}", level, self.key);
        }
    }

    /// Regenerates `level` synchronously at `cells_per_side`.
    pub fn regenerate<G, B>(
        &mut self,
        level: LodLevel,
        cells_per_side: u32,
        generator: &SharedGenerator<G>,
        backend: &mut B,
    ) where
        G: GeometryBuilder,
        B: RenderBackend<Mesh = M>,
    {
        let mesh = generator.generate(self.key.x, self.key.z, cells_per_side, self.world_scale);
        self.build_lod_from_data(mesh, level, backend);
    }

    /// Draws `level`, or the first ready level when it is missing.
    ///
    /// Returns the level drawn, or `None` when no level is ready.
    pub fn draw<B>(&self, level: LodLevel, wireframe: bool, backend: &mut B) -> Option<LodLevel>
    where
        B: RenderBackend<Mesh = M>,
    {
        let drawn = self.resolve(level)?;
        let record = self.levels[drawn.index()].as_ref()?;

        if wireframe {
            backend.set_polygon_mode(PolygonMode::Line);
        }
        backend.draw(&record.gpu);
        if wireframe {
            backend.set_polygon_mode(PolygonMode::Fill);
        }
        Some(drawn)
    }

    /// Level that a draw of `level` would use.
    #[must_use]
    pub fn resolve(&self, level: LodLevel) -> Option<LodLevel> {
        if self.is_ready(level) {
            Some(level)
        } else {
            self.best_ready_lod()
        }
    }

    /// Vertex heights of the finest ready level, empty when none is ready.
    #[must_use]
    pub fn export_heights(&self) -> Vec<f32> {
        self.best_ready_lod()
            .and_then(|level| self.lod(level))
            .map(|record| record.mesh.heights())
            .unwrap_or_default()
    }

    /// Bounds of `level`, if ready.
    #[must_use]
    pub fn bounds(&self, level: LodLevel) -> Option<Aabb> {
        self.lod(level).map(LevelOfDetail::bounds)
    }

    /// Record at `level`, if ready.
    #[must_use]
    pub fn lod(&self, level: LodLevel) -> Option<&LevelOfDetail<M>> {
        self.levels[level.index()].as_ref()
    }

    /// Whether `level` is ready.
    #[must_use]
    pub fn is_ready(&self, level: LodLevel) -> bool {
        self.levels[level.index()].is_some()
    }

    /// Readiness flags, finest first.
    #[must_use]
    pub fn lod_ready(&self) -> [bool; LOD_COUNT] {
        [
            self.levels[0].is_some(),
            self.levels[1].is_some(),
            self.levels[2].is_some(),
        ]
    }

    /// Whether any level is ready.
    #[must_use]
    pub fn has_any_lod(&self) -> bool {
        self.levels.iter().any(Option::is_some)
    }

    /// Finest ready level.
    #[must_use]
    pub fn best_ready_lod(&self) -> Option<LodLevel> {
        let index = self.levels.iter().position(Option::is_some)?;
        LodLevel::try_from(index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CountingBackend;
    use crate::generator::NoiseTerrainGenerator;

    fn chunk() -> Chunk<crate::backend::CountedMesh> {
        Chunk::new(ChunkKey::new(1, -1), 65, 1.0)
    }

    fn shared() -> SharedGenerator<NoiseTerrainGenerator> {
        SharedGenerator::new(NoiseTerrainGenerator::with_seed(3))
    }

    #[test]
    fn test_new_chunk_has_nothing_ready() {
        let chunk = chunk();
        assert!(!chunk.has_any_lod());
        assert_eq!(chunk.lod_ready(), [false; 3]);
        assert!(chunk.export_heights().is_empty());
        assert_eq!(chunk.center(), Vec3::new(96.0, 0.0, -32.0));
    }

    #[test]
    fn test_draw_falls_back_to_coarser_level() {
        let generator = shared();
        let mut backend = CountingBackend::new();
        let mut chunk = chunk();
        chunk.regenerate(LodLevel::Low, 17, &generator, &mut backend);

        assert_eq!(chunk.lod_ready(), [false, false, true]);
        assert_eq!(
            chunk.draw(LodLevel::High, false, &mut backend),
            Some(LodLevel::Low)
        );
        assert_eq!(backend.frame_draws().len(), 1);
        assert_eq!(backend.frame_draws()[0].index_count, 16 * 16 * 6);
    }

    #[test]
    fn test_draw_without_levels_is_noop() {
        let mut backend = CountingBackend::new();
        let chunk = chunk();
        assert_eq!(chunk.draw(LodLevel::Medium, true, &mut backend), None);
        assert_eq!(backend.draws(), 0);
        assert_eq!(backend.mode_switches(), 0);
    }

    #[test]
    fn test_wireframe_resets_to_fill() {
        let generator = shared();
        let mut backend = CountingBackend::new();
        let mut chunk = chunk();
        chunk.regenerate(LodLevel::Medium, 33, &generator, &mut backend);

        assert_eq!(
            chunk.draw(LodLevel::Medium, true, &mut backend),
            Some(LodLevel::Medium)
        );
        assert_eq!(backend.frame_draws()[0].mode, PolygonMode::Line);
        assert_eq!(backend.mode(), PolygonMode::Fill);
    }

    #[test]
    fn test_replacing_level_releases_previous_mesh() {
        let generator = shared();
        let mut backend = CountingBackend::new();
        let mut chunk = chunk();

        chunk.regenerate(LodLevel::High, 65, &generator, &mut backend);
        chunk.regenerate(LodLevel::High, 65, &generator, &mut backend);
        assert_eq!(backend.uploads(), 2);
        assert_eq!(backend.live_meshes(), 1);

        drop(chunk);
        assert_eq!(backend.live_meshes(), 0);
    }

    #[test]
    fn test_export_heights_prefers_finest() {
        let generator = shared();
        let mut backend = CountingBackend::new();
        let mut chunk = chunk();

        chunk.regenerate(LodLevel::Low, 17, &generator, &mut backend);
        assert_eq!(chunk.export_heights().len(), 17 * 17);

        chunk.regenerate(LodLevel::High, 65, &generator, &mut backend);
        let heights = chunk.export_heights();
        assert_eq!(heights.len(), 65 * 65);
        let expected = generator.height_at(64.0, -64.0);
        assert!((heights[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_follow_geometry() {
        let generator = shared();
        let mut backend = CountingBackend::new();
        let mut chunk = chunk();
        chunk.regenerate(LodLevel::Medium, 33, &generator, &mut backend);

        let bounds = chunk.bounds(LodLevel::Medium).expect("level ready");
        assert_eq!(bounds.min.x, 64.0);
        assert_eq!(bounds.max.x, 128.0);
        assert_eq!(bounds.min.z, -64.0);
        assert_eq!(bounds.max.z, 0.0);
        assert!(chunk.bounds(LodLevel::High).is_none());
    }
}
