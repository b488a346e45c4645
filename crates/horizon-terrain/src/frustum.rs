//! View-frustum extraction and bounding-box visibility.

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::Aabb;

/// Six clip planes (`left, right, bottom, top, near, far`).
///
/// Each plane is `(nx, ny, nz, d)` with a unit normal pointing inwards, so a
/// point `p` is inside when `n · p + d >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts the frustum from a view-projection matrix.
    ///
    /// Expects a `[0, 1]` clip depth range, as produced by
    /// `Mat4::perspective_rh` and used by wgpu.
    #[must_use]
    pub fn from_view_projection(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self::from_planes([r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2])
    }

    /// Builds a frustum from raw plane equations, normalising each plane.
    #[must_use]
    pub fn from_planes(planes: [Vec4; 6]) -> Self {
        Self {
            planes: planes.map(|p| {
                let len = p.truncate().length();
                if len > f32::EPSILON {
                    p / len
                } else {
                    p
                }
            }),
        }
    }

    /// The normalised plane equations.
    #[must_use]
    pub const fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Whether any part of the box can be inside the frustum.
    ///
    /// Uses the positive-vertex test: the box is rejected only when its
    /// corner furthest along a plane's normal is still behind that plane.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Vec3::new(
                if plane.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.truncate().dot(positive) + plane.w >= 0.0
        })
    }
}

/// Visibility predicate used by the terrain cache when culling chunks.
#[must_use]
pub fn is_visible(bounds: &Aabb, frustum: &Frustum) -> bool {
    frustum.intersects_aabb(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 1000.0);
        Frustum::from_view_projection(proj * view)
    }

    #[test]
    fn test_box_in_front_is_visible() {
        let f = forward_frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
        assert!(is_visible(&aabb, &f));
    }

    #[test]
    fn test_box_behind_is_culled() {
        let f = forward_frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(!is_visible(&aabb, &f));
    }

    #[test]
    fn test_box_beyond_far_plane_is_culled() {
        let f = forward_frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -2010.0), Vec3::new(1.0, 1.0, -2000.0));
        assert!(!is_visible(&aabb, &f));
    }

    #[test]
    fn test_straddling_box_is_visible() {
        let f = forward_frustum();
        let aabb = Aabb::new(Vec3::splat(-500.0), Vec3::splat(500.0));
        assert!(is_visible(&aabb, &f));
    }

    #[test]
    fn test_point_box_tested_as_point() {
        let f = forward_frustum();
        let inside = Aabb::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -5.0));
        let outside = Aabb::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 5.0));
        assert!(is_visible(&inside, &f));
        assert!(!is_visible(&outside, &f));
    }

    #[test]
    fn test_planes_are_normalised() {
        for plane in forward_frustum().planes() {
            assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
        }
    }
}
