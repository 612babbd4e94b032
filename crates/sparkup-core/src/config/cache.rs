//! Cache configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Top-level cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Room membership snapshot cache.
    #[serde(default)]
    pub membership: MembershipCacheConfig,
}

/// Time-bucketed room membership cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCacheConfig {
    /// Bucket width in minutes. Must be within `1..=60`.
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,
    /// Maximum number of `(room, bucket)` snapshots kept.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MembershipCacheConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl MembershipCacheConfig {
    /// Checks the bucket width and capacity.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=60).contains(&self.interval_minutes) {
            return Err(AppError::configuration(format!(
                "cache.membership.interval_minutes must be between 1 and 60, got {}",
                self.interval_minutes
            )));
        }
        if self.max_capacity == 0 {
            return Err(AppError::configuration(
                "cache.membership.max_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_interval() -> u32 {
    5
}

fn default_max_capacity() -> u64 {
    1000
}
