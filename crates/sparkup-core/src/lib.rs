//! # sparkup-core
//!
//! Core crate for SparkUp chat. Contains configuration schemas, typed
//! identifiers, wire timestamp handling, pagination types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other SparkUp crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
