//! # sparkup-entity
//!
//! Domain entity models for SparkUp chat. Table rows derive
//! `sqlx::FromRow`; composite read models (messages with their read-set,
//! room overviews, member profiles) are assembled by the store layer.
//! Every timestamp serializes in the millisecond `Z` wire format.

pub mod membership;
pub mod message;
pub mod room;
