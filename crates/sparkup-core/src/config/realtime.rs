//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum live WebSocket connections per user (devices).
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound frame buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
        }
    }
}

impl RealtimeConfig {
    /// Checks connection limits.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_connections_per_user == 0 {
            return Err(AppError::configuration(
                "realtime.max_connections_per_user must be greater than zero",
            ));
        }
        if self.channel_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.channel_buffer_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}
