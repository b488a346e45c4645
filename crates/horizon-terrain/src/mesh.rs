//! CPU-side terrain geometry buffers.

use bytemuck::{Pod, Zeroable};

/// A single terrain vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TerrainVertex {
    /// World-space position
    pub position: [f32; 3],
    /// Unit surface normal
    pub normal: [f32; 3],
    /// Vertex colour (linear RGB)
    pub color: [f32; 3],
    /// Texture coordinate across the chunk, `[0, 1]` on both axes
    pub tex_coord: [f32; 2],
}

impl TerrainVertex {
    /// Vertex buffer layout matching the field order above.
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x2
    ];

    /// Creates a vertex.
    #[must_use]
    pub const fn new(
        position: [f32; 3],
        normal: [f32; 3],
        color: [f32; 3],
        tex_coord: [f32; 2],
    ) -> Self {
        Self {
            position,
            normal,
            color,
            tex_coord,
        }
    }

    /// Returns the wgpu vertex buffer layout for this vertex type.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A self-contained indexed triangle list for one chunk at one resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex buffer
    pub vertices: Vec<TerrainVertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Creates mesh data from vertex and index buffers.
    #[must_use]
    pub fn new(vertices: Vec<TerrainVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Removes all geometry.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether the mesh has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex heights (`y`) in vertex-buffer order.
    #[must_use]
    pub fn heights(&self) -> Vec<f32> {
        self.vertices.iter().map(|v| v.position[1]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 11 * 4);
        assert_eq!(TerrainVertex::layout().array_stride, 44);
    }

    #[test]
    fn test_mesh_counts_and_clear() {
        let v = TerrainVertex::new([0.0, 2.5, 0.0], [0.0, 1.0, 0.0], [1.0; 3], [0.0; 2]);
        let mut mesh = MeshData::new(vec![v; 3], vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.heights(), vec![2.5; 3]);

        mesh.clear();
        assert!(mesh.is_empty());
        assert_eq!(mesh.index_count(), 0);
    }
}
