//! Geometry generation collaborator and its serialised shared handle.
//!
//! The cache never assumes a generator is reentrant: every call, whether it
//! comes from a worker thread or from the control thread, goes through
//! [`SharedGenerator`], which holds the generator behind a single mutex and
//! releases it as soon as the call returns.

use std::sync::Arc;

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mesh::{MeshData, TerrainVertex};

/// Default cells per side of the finest LOD, which fixes the chunk extent.
pub const DEFAULT_BASE_CELLS: u32 = 65;

/// Builds terrain geometry for chunks.
pub trait GeometryBuilder: Send + 'static {
    /// Generates the mesh for chunk `(chunk_x, chunk_z)` with
    /// `cells_per_side × cells_per_side` vertices.
    ///
    /// Every resolution must cover the same world-space extent.
    fn generate_chunk(
        &mut self,
        chunk_x: i32,
        chunk_z: i32,
        cells_per_side: u32,
        world_scale: f32,
    ) -> MeshData;

    /// Terrain height at a world position.
    fn height_at(&self, world_x: f32, world_z: f32) -> f32;

    /// Finest resolution whose extent the generator's meshes span, if fixed.
    ///
    /// The cache rejects a generator whose value differs from its own finest
    /// resolution, since chunks would no longer tile.
    fn base_cells(&self) -> Option<u32> {
        None
    }
}

/// Generator handle shared between the control thread and workers.
///
/// Cloning the handle shares the same generator and the same lock.
pub struct SharedGenerator<G> {
    inner: Arc<Mutex<G>>,
}

impl<G> Clone for SharedGenerator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: GeometryBuilder> SharedGenerator<G> {
    /// Wraps a generator.
    pub fn new(generator: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(generator)),
        }
    }

    /// Generates a chunk while holding the generator lock.
    pub fn generate(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        cells_per_side: u32,
        world_scale: f32,
    ) -> MeshData {
        let mut generator = self.inner.lock();
        generator.generate_chunk(chunk_x, chunk_z, cells_per_side, world_scale)
    }

    /// Samples the terrain height while holding the generator lock.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        self.inner.lock().height_at(world_x, world_z)
    }

    /// Fixed finest resolution of the generator, if any.
    pub fn base_cells(&self) -> Option<u32> {
        self.inner.lock().base_cells()
    }

    /// Runs `f` with exclusive access to the generator.
    pub fn with<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<G> std::fmt::Debug for SharedGenerator<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGenerator")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// Builds a regular grid mesh for one chunk from a height function.
///
/// The grid always spans `(base_cells - 1) * world_scale` world units so that
/// coarser resolutions cover the same area as the finest one. Normals are the
/// area-weighted average of adjacent face normals. Colours blend from `base`
/// towards `tint` with normalised height.
#[allow(clippy::too_many_arguments)]
pub fn build_grid_mesh(
    chunk_x: i32,
    chunk_z: i32,
    cells_per_side: u32,
    base_cells: u32,
    world_scale: f32,
    height_scale: f32,
    base: Vec3,
    tint: Vec3,
    mut height: impl FnMut(f32, f32) -> f32,
) -> MeshData {
    if cells_per_side < 2 {
        return MeshData::default();
    }

    let n = cells_per_side as usize;
    let full_size = (base_cells.max(2) - 1) as f32 * world_scale;
    let origin_x = chunk_x as f32 * full_size;
    let origin_z = chunk_z as f32 * full_size;
    let step = 1.0 / (cells_per_side - 1) as f32;

    let mut vertices = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let u = col as f32 * step;
            let v = row as f32 * step;
            let wx = origin_x + u * full_size;
            let wz = origin_z + v * full_size;
            let h = height(wx, wz);

            let t = if height_scale > 0.0 {
                ((h / height_scale + 1.0) * 0.5).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let color = base.lerp(tint, t);

            vertices.push(TerrainVertex::new(
                [wx, h, wz],
                [0.0, 0.0, 0.0],
                color.to_array(),
                [u, v],
            ));
        }
    }

    let mut indices = Vec::with_capacity((n - 1) * (n - 1) * 6);
    for row in 0..n - 1 {
        for col in 0..n - 1 {
            let tl = (row * n + col) as u32;
            let tr = tl + 1;
            let bl = ((row + 1) * n + col) as u32;
            let br = bl + 1;
            indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
        }
    }

    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [ia, ib, ic] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let a = Vec3::from(vertices[ia].position);
        let b = Vec3::from(vertices[ib].position);
        let c = Vec3::from(vertices[ic].position);
        let face = (b - a).cross(c - a);
        normals[ia] += face;
        normals[ib] += face;
        normals[ic] += face;
    }
    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = normal.try_normalize().unwrap_or(Vec3::Y).to_array();
    }

    MeshData::new(vertices, indices)
}

/// Noise parameters for [`NoiseTerrainGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Frequency of the first octave
    pub base_frequency: f64,
    /// Number of octaves
    pub octaves: usize,
    /// Amplitude falloff per octave
    pub persistence: f64,
    /// Frequency growth per octave
    pub lacunarity: f64,
    /// World units of height for a noise value of 1
    pub height_scale: f32,
    /// Noise seed
    pub seed: u32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            base_frequency: 0.01,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            height_scale: 20.0,
            seed: 1337,
        }
    }
}

/// Fractal Perlin heightfield generator.
pub struct NoiseTerrainGenerator {
    params: NoiseParams,
    base_cells: u32,
    fbm: Fbm<Perlin>,
    chunks_generated: u64,
}

impl NoiseTerrainGenerator {
    /// Creates a generator with the given parameters.
    #[must_use]
    pub fn new(params: NoiseParams) -> Self {
        let fbm = Self::build_noise(&params);
        Self {
            params,
            base_cells: DEFAULT_BASE_CELLS,
            fbm,
            chunks_generated: 0,
        }
    }

    /// Creates a generator with default parameters and the given seed.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::new(NoiseParams {
            seed,
            ..Default::default()
        })
    }

    /// Sets the cells per side of the finest LOD (the chunk extent).
    #[must_use]
    pub fn with_base_cells(mut self, base_cells: u32) -> Self {
        self.base_cells = base_cells;
        self
    }

    /// Replaces the noise parameters and reseeds.
    pub fn set_params(&mut self, params: NoiseParams) {
        self.fbm = Self::build_noise(&params);
        self.params = params;
    }

    /// Current noise parameters.
    #[must_use]
    pub const fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Number of chunks generated so far.
    #[must_use]
    pub const fn chunks_generated(&self) -> u64 {
        self.chunks_generated
    }

    fn build_noise(params: &NoiseParams) -> Fbm<Perlin> {
        Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves.max(1))
            .set_frequency(params.base_frequency)
            .set_persistence(params.persistence)
            .set_lacunarity(params.lacunarity)
    }

    fn sample(&self, world_x: f32, world_z: f32) -> f32 {
        self.fbm.get([f64::from(world_x), f64::from(world_z)]) as f32 * self.params.height_scale
    }
}

impl GeometryBuilder for NoiseTerrainGenerator {
    fn generate_chunk(
        &mut self,
        chunk_x: i32,
        chunk_z: i32,
        cells_per_side: u32,
        world_scale: f32,
    ) -> MeshData {
        let span = (self.base_cells.max(2) - 1) as f32;
        let detail = ((cells_per_side.saturating_sub(1)) as f32 / span).clamp(0.0, 1.0);
        let tint = Vec3::new(1.0, 0.0, 0.0).lerp(Vec3::new(0.0, 1.0, 0.0), detail);

        let mesh = build_grid_mesh(
            chunk_x,
            chunk_z,
            cells_per_side,
            self.base_cells,
            world_scale,
            self.params.height_scale,
            Vec3::new(0.15, 0.2, 0.12),
            tint,
            |x, z| self.sample(x, z),
        );
        self.chunks_generated += 1;
        debug!(
            "Generated chunk ({}, {}) at {} cells: {} vertices",
            chunk_x,
            chunk_z,
            cells_per_side,
            mesh.vertex_count()
        );
        mesh
    }

    fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        self.sample(world_x, world_z)
    }

    fn base_cells(&self) -> Option<u32> {
        Some(self.base_cells)
    }
}

impl std::fmt::Debug for NoiseTerrainGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseTerrainGenerator")
            .field("params", &self.params)
            .field("base_cells", &self.base_cells)
            .field("chunks_generated", &self.chunks_generated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_mesh_shape() {
        let mesh = build_grid_mesh(0, 0, 5, 65, 1.0, 1.0, Vec3::ZERO, Vec3::ONE, |_, _| 0.0);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.index_count(), 4 * 4 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));

        // Coarse grids still span the full chunk extent.
        let last = mesh.vertices[24].position;
        assert_eq!(last, [64.0, 0.0, 64.0]);
    }

    #[test]
    fn test_flat_grid_normals_point_up() {
        let mesh = build_grid_mesh(2, -1, 9, 65, 0.5, 1.0, Vec3::ZERO, Vec3::ONE, |_, _| 3.0);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
        assert_eq!(mesh.vertices[0].position, [64.0, 3.0, -32.0]);
    }

    #[test]
    fn test_degenerate_resolution_is_empty() {
        let mesh = build_grid_mesh(0, 0, 1, 65, 1.0, 1.0, Vec3::ZERO, Vec3::ONE, |_, _| 0.0);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_generation_deterministic() {
        let mut gen1 = NoiseTerrainGenerator::with_seed(42);
        let mut gen2 = NoiseTerrainGenerator::with_seed(42);

        let a = gen1.generate_chunk(3, -2, 17, 1.0);
        let b = gen2.generate_chunk(3, -2, 17, 1.0);
        assert_eq!(a, b);
        assert_eq!(gen1.chunks_generated(), 1);
    }

    #[test]
    fn test_mesh_heights_match_height_at() {
        let mut generator = NoiseTerrainGenerator::with_seed(7);
        let mesh = generator.generate_chunk(1, 1, 9, 1.0);
        for v in &mesh.vertices {
            let expected = generator.height_at(v.position[0], v.position[2]);
            assert!((v.position[1] - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_shared_generator_serialises_access() {
        let shared = SharedGenerator::new(NoiseTerrainGenerator::with_seed(1));
        let other = shared.clone();
        let mesh = other.generate(0, 0, 5, 1.0);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(shared.with(|g| g.chunks_generated()), 1);
    }
}
