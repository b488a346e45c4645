//! wgpu implementation of [`RenderBackend`].
//!
//! Uploads create one vertex and one index buffer per level of detail. Draw
//! calls issued by the cache are queued and replayed into a render pass by
//! [`WgpuBackend::record`], which picks the fill or line pipeline per draw.

use std::sync::Arc;

use tracing::trace;
use wgpu::util::DeviceExt;

use crate::backend::{PolygonMode, RenderBackend};
use crate::mesh::MeshData;

/// GPU buffers for one level of detail.
#[derive(Debug)]
pub struct GpuMesh {
    buffers: Option<Arc<MeshBuffers>>,
}

#[derive(Debug)]
struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Number of indices drawn, zero for empty geometry.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.buffers.as_ref().map_or(0, |b| b.index_count)
    }
}

/// A queued draw call.
#[derive(Debug, Clone)]
pub struct QueuedDraw {
    buffers: Arc<MeshBuffers>,
    mode: PolygonMode,
}

impl QueuedDraw {
    /// Polygon mode requested for this draw.
    #[must_use]
    pub const fn mode(&self) -> PolygonMode {
        self.mode
    }
}

/// Render backend backed by a wgpu device.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    mode: PolygonMode,
    queued: Vec<QueuedDraw>,
    uploads: u64,
}

impl WgpuBackend {
    /// Creates a backend uploading through `device`.
    #[must_use]
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            mode: PolygonMode::Fill,
            queued: Vec::with_capacity(1024),
            uploads: 0,
        }
    }

    /// The device used for uploads.
    #[must_use]
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Total meshes uploaded.
    #[must_use]
    pub const fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Draws queued since the last [`WgpuBackend::record`].
    #[must_use]
    pub fn queued(&self) -> &[QueuedDraw] {
        &self.queued
    }

    /// Replays and clears the queued draws.
    ///
    /// The caller binds everything except the pipeline and vertex/index
    /// buffers. `line` is used for wireframe draws; pass the fill pipeline
    /// again when the device lacks line rasterisation.
    pub fn record(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        fill: &wgpu::RenderPipeline,
        line: &wgpu::RenderPipeline,
    ) -> usize {
        let mut bound = None;
        let count = self.queued.len();
        for draw in self.queued.drain(..) {
            if bound != Some(draw.mode) {
                pass.set_pipeline(match draw.mode {
                    PolygonMode::Fill => fill,
                    PolygonMode::Line => line,
                });
                bound = Some(draw.mode);
            }
            pass.set_vertex_buffer(0, draw.buffers.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.buffers.index_count, 0, 0..1);
        }
        trace!("Recorded {} terrain draws", count);
        count
    }
}

impl RenderBackend for WgpuBackend {
    type Mesh = GpuMesh;

    fn upload(&mut self, mesh: &MeshData) -> GpuMesh {
        self.uploads += 1;
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return GpuMesh { buffers: None };
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Terrain LOD Vertices"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Terrain LOD Indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        GpuMesh {
            buffers: Some(Arc::new(MeshBuffers {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
            })),
        }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.mode = mode;
    }

    fn draw(&mut self, mesh: &GpuMesh) {
        if let Some(buffers) = &mesh.buffers {
            self.queued.push(QueuedDraw {
                buffers: Arc::clone(buffers),
                mode: self.mode,
            });
        }
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("mode", &self.mode)
            .field("queued", &self.queued.len())
            .field("uploads", &self.uploads)
            .finish()
    }
}
