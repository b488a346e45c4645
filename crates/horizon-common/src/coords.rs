//! Coordinate types for world and chunk positions.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Chunk key (identifies a cell in the terrain grid).
///
/// Keys are derived from world-space `x`/`z` positions by floor division by
/// the chunk world size, so negative positions map to negative keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkKey {
    /// Creates a new chunk key.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the key of the chunk containing the given world position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_world(world_x: f32, world_z: f32, chunk_world_size: f32) -> Self {
        Self {
            x: (world_x / chunk_world_size).floor() as i32,
            z: (world_z / chunk_world_size).floor() as i32,
        }
    }

    /// Returns the world-space origin (minimum `x`/`z` corner) of the chunk.
    #[must_use]
    pub fn world_origin(self, chunk_world_size: f32) -> (f32, f32) {
        (
            self.x as f32 * chunk_world_size,
            self.z as f32 * chunk_world_size,
        )
    }

    /// Returns the world-space centre of the chunk at ground level (`y = 0`).
    #[must_use]
    pub fn world_center(self, chunk_world_size: f32) -> Vec3 {
        let (ox, oz) = self.world_origin(chunk_world_size);
        let half = chunk_world_size * 0.5;
        Vec3::new(ox + half, 0.0, oz + half)
    }

    /// Returns the key offset by the given number of chunks.
    ///
    /// Saturates at the edges of the key range.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// Iterates the square window of keys within `radius` chunks of this one.
    ///
    /// Rows are visited in increasing `z`, and keys within a row in
    /// increasing `x`. A radius of zero yields only `self`.
    pub fn window(self, radius: i32) -> impl Iterator<Item = ChunkKey> {
        let radius = radius.max(0);
        (-radius..=radius)
            .flat_map(move |dz| (-radius..=radius).map(move |dx| self.offset(dx, dz)))
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_world_positive_and_negative() {
        let size = 64.0;
        assert_eq!(ChunkKey::from_world(0.0, 0.0, size), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(63.9, 10.0, size), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(64.0, 0.0, size), ChunkKey::new(1, 0));
        assert_eq!(ChunkKey::from_world(-0.1, -0.1, size), ChunkKey::new(-1, -1));
        assert_eq!(ChunkKey::from_world(-64.0, 128.5, size), ChunkKey::new(-1, 2));
    }

    #[test]
    fn test_world_center() {
        let center = ChunkKey::new(1, -1).world_center(64.0);
        assert_eq!(center, Vec3::new(96.0, 0.0, -32.0));
    }

    #[test]
    fn test_window_order_and_size() {
        let keys: Vec<_> = ChunkKey::new(5, 5).window(1).collect();
        assert_eq!(keys.len(), 9);
        assert_eq!(keys[0], ChunkKey::new(4, 4));
        assert_eq!(keys[1], ChunkKey::new(5, 4));
        assert_eq!(keys[8], ChunkKey::new(6, 6));

        let single: Vec<_> = ChunkKey::new(-2, 3).window(0).collect();
        assert_eq!(single, vec![ChunkKey::new(-2, 3)]);
    }

    #[test]
    fn test_window_saturates_at_key_range_edge() {
        let edge = ChunkKey::from_world(1.0e12, -1.0e12, 64.0);
        assert_eq!(edge, ChunkKey::new(i32::MAX, i32::MIN));

        let keys: Vec<_> = edge.window(1).collect();
        assert_eq!(keys.len(), 9);
        assert!(keys.iter().all(|key| key.x >= i32::MAX - 1));
        assert!(keys.iter().all(|key| key.z <= i32::MIN + 1));
    }

    proptest! {
        #[test]
        fn test_from_world_is_stable_inside_chunk(
            cx in -1000i32..1000,
            cz in -1000i32..1000,
            u in 0.01f32..0.99,
            v in 0.01f32..0.99,
            w in 0.01f32..0.99,
        ) {
            let size = 64.0;
            let key = ChunkKey::new(cx, cz);
            let a = ChunkKey::from_world((cx as f32 + u) * size, (cz as f32 + v) * size, size);
            let b = ChunkKey::from_world((cx as f32 + w) * size, (cz as f32 + u) * size, size);
            prop_assert_eq!(a, key);
            prop_assert_eq!(b, key);
        }
    }
}
