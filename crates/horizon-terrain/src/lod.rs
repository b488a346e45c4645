//! Level-of-detail identifiers and distance selection.

use serde::{Deserialize, Serialize};

use crate::error::TerrainError;

/// Number of LOD levels kept per chunk.
pub const LOD_COUNT: usize = 3;

/// Default cells per side for each LOD, finest first.
pub const DEFAULT_LOD_RESOLUTIONS: [u32; LOD_COUNT] = [65, 33, 17];

/// Default distance thresholds between LOD 0/1 and LOD 1/2.
pub const DEFAULT_LOD_DISTANCES: [f32; LOD_COUNT - 1] = [150.0, 300.0];

/// A discrete geometric resolution of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LodLevel {
    /// Highest detail (index 0)
    High,
    /// Mid detail (index 1)
    Medium,
    /// Lowest detail (index 2)
    Low,
}

impl LodLevel {
    /// All levels, finest first. This is also the fallback scan order.
    pub const ALL: [Self; LOD_COUNT] = [Self::High, Self::Medium, Self::Low];

    /// Numeric index of the level (0 = finest).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Picks the level for a viewer distance given ascending thresholds.
    ///
    /// `d < thresholds[0]` is [`LodLevel::High`], `d < thresholds[1]` is
    /// [`LodLevel::Medium`], anything further is [`LodLevel::Low`].
    #[must_use]
    pub fn for_distance(distance: f32, thresholds: &[f32; LOD_COUNT - 1]) -> Self {
        if distance < thresholds[0] {
            Self::High
        } else if distance < thresholds[1] {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl TryFrom<usize> for LodLevel {
    type Error = TerrainError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(TerrainError::InvalidLodIndex(index))
    }
}

impl std::fmt::Display for LodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LOD{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_thresholds() {
        let t = DEFAULT_LOD_DISTANCES;
        assert_eq!(LodLevel::for_distance(0.0, &t), LodLevel::High);
        assert_eq!(LodLevel::for_distance(149.9, &t), LodLevel::High);
        assert_eq!(LodLevel::for_distance(150.0, &t), LodLevel::Medium);
        assert_eq!(LodLevel::for_distance(299.9, &t), LodLevel::Medium);
        assert_eq!(LodLevel::for_distance(300.0, &t), LodLevel::Low);
        assert_eq!(LodLevel::for_distance(1.0e6, &t), LodLevel::Low);
    }

    #[test]
    fn test_index_round_trip_and_invalid() {
        for level in LodLevel::ALL {
            assert_eq!(LodLevel::try_from(level.index()).ok(), Some(level));
        }
        assert!(matches!(
            LodLevel::try_from(3),
            Err(TerrainError::InvalidLodIndex(3))
        ));
    }

    proptest! {
        #[test]
        fn test_lod_is_monotonic_in_distance(a in 0.0f32..5000.0, b in 0.0f32..5000.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            let t = DEFAULT_LOD_DISTANCES;
            prop_assert!(LodLevel::for_distance(near, &t) <= LodLevel::for_distance(far, &t));
        }
    }
}
