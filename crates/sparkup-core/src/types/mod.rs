//! Shared value types: identifiers, pagination, and wire timestamps.

pub mod id;
pub mod pagination;
pub mod timestamp;

pub use id::{MessageId, PostId, UserId};
pub use pagination::{PageRequest, PageResponse};
