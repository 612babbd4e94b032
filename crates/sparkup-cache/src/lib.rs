//! # sparkup-cache
//!
//! Membership snapshots for the real-time send path. A room's member list
//! is loaded from the store at most once per time bucket and kept in an
//! in-process [moka](https://crates.io/crates/moka) cache bounded by entry
//! count with LRU eviction.

pub mod bucket;
pub mod membership;

pub use bucket::TimeBucket;
pub use membership::MembershipCache;
