//! Axis-aligned bounding boxes derived from geometry.

use glam::Vec3;

use crate::mesh::{MeshData, TerrainVertex};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Computes the tightest box around the given vertices.
    ///
    /// An empty vertex list yields a zero-sized box at the origin, which
    /// frustum tests treat as a point.
    #[must_use]
    pub fn from_vertices(vertices: &[TerrainVertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        vertices.iter().fold(
            Self::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |acc, v| {
                let p = Vec3::from(v.position);
                Self::new(acc.min.min(p), acc.max.max(p))
            },
        )
    }

    /// Computes the box around a mesh's vertices.
    #[must_use]
    pub fn from_mesh(mesh: &MeshData) -> Self {
        Self::from_vertices(&mesh.vertices)
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether the point lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}
