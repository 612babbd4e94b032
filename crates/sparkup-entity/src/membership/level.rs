//! Participation level tiers.

use serde::{Deserialize, Serialize};

/// Tier derived from how many rooms a user has taken part in.
///
/// Up to 10 participations is level 1, then one level per further ten,
/// topping out at level 5 from 41 participations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationLevel(u8);

impl ParticipationLevel {
    /// Highest reachable level.
    pub const MAX: u8 = 5;

    /// Compute the level for a participation count.
    pub fn from_participations(count: u64) -> Self {
        let level = match count {
            0..=10 => 1,
            11..=20 => 2,
            21..=30 => 3,
            31..=40 => 4,
            _ => Self::MAX,
        };
        Self(level)
    }

    /// Numeric level, 1 through 5.
    pub fn get(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (0, 1),
            (10, 1),
            (11, 2),
            (20, 2),
            (21, 3),
            (30, 3),
            (31, 4),
            (40, 4),
            (41, 5),
            (500, 5),
        ];
        for (count, expected) in cases {
            assert_eq!(
                ParticipationLevel::from_participations(count).get(),
                expected,
                "count {count}"
            );
        }
    }
}
