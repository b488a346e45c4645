//! Render backend seam between the terrain cache and the GPU.
//!
//! The cache only ever talks to a [`RenderBackend`] from the control thread:
//! meshes are uploaded when a harvested result is installed and drawn from
//! [`crate::TerrainCache::draw`]. A backend's mesh type owns its GPU
//! resources and releases them when dropped, so evicting or replacing a
//! level of detail frees its buffers without any explicit call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::mesh::MeshData;

/// Rasterisation mode for subsequent draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    /// Filled triangles
    #[default]
    Fill,
    /// Triangle edges only
    Line,
}

/// A sink for terrain meshes.
pub trait RenderBackend {
    /// Uploaded mesh. Dropping it releases the GPU resources.
    type Mesh;

    /// Uploads geometry and returns the owning GPU mesh.
    fn upload(&mut self, mesh: &MeshData) -> Self::Mesh;

    /// Sets the polygon mode for subsequent draws.
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Issues a draw call for a mesh.
    fn draw(&mut self, mesh: &Self::Mesh);
}

/// A draw call recorded by [`CountingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    /// Mesh that was drawn
    pub mesh_id: u64,
    /// Index count of the mesh
    pub index_count: usize,
    /// Polygon mode active at the time of the draw
    pub mode: PolygonMode,
}

/// Mesh handle produced by [`CountingBackend`].
#[derive(Debug)]
pub struct CountedMesh {
    id: u64,
    vertex_count: usize,
    index_count: usize,
    live: Arc<AtomicUsize>,
}

impl CountedMesh {
    /// Unique id of the upload that produced this mesh.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Number of uploaded vertices.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

impl Drop for CountedMesh {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Headless backend that counts uploads, live meshes and draw calls.
#[derive(Debug, Default)]
pub struct CountingBackend {
    next_id: u64,
    uploads: u64,
    draws: u64,
    mode_switches: u64,
    mode: PolygonMode,
    live: Arc<AtomicUsize>,
    frame: Vec<DrawRecord>,
}

impl CountingBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total meshes uploaded.
    #[must_use]
    pub const fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Total draw calls issued.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Total polygon-mode changes.
    #[must_use]
    pub const fn mode_switches(&self) -> u64 {
        self.mode_switches
    }

    /// Current polygon mode.
    #[must_use]
    pub const fn mode(&self) -> PolygonMode {
        self.mode
    }

    /// Meshes uploaded and not yet dropped.
    #[must_use]
    pub fn live_meshes(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Draw calls recorded since the last [`CountingBackend::begin_frame`].
    #[must_use]
    pub fn frame_draws(&self) -> &[DrawRecord] {
        &self.frame
    }

    /// Clears the per-frame draw log.
    pub fn begin_frame(&mut self) {
        self.frame.clear();
    }
}

impl RenderBackend for CountingBackend {
    type Mesh = CountedMesh;

    fn upload(&mut self, mesh: &MeshData) -> CountedMesh {
        self.next_id += 1;
        self.uploads += 1;
        self.live.fetch_add(1, Ordering::Relaxed);
        CountedMesh {
            id: self.next_id,
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
            live: Arc::clone(&self.live),
        }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        if self.mode != mode {
            self.mode_switches += 1;
        }
        self.mode = mode;
    }

    fn draw(&mut self, mesh: &CountedMesh) {
        self.draws += 1;
        self.frame.push(DrawRecord {
            mesh_id: mesh.id,
            index_count: mesh.index_count,
            mode: self.mode,
        });
    }
}
