//! # sparkup-service
//!
//! Read-side and lifecycle services for SparkUp chat. These go straight to
//! the store and never consult the membership cache, so authorization on
//! these paths always sees current membership.
//!
//! Services follow constructor injection: every store handle is passed in
//! as an `Arc` at construction time.

pub mod chat;

pub use chat::{HistoryService, MemberService, RoomService};
