//! Chat room entities.

pub mod model;
pub mod overview;

pub use model::ChatRoom;
pub use overview::{LatestMessage, RoomOverview};
