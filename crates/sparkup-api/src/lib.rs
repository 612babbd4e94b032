//! # sparkup-api
//!
//! HTTP API layer for SparkUp chat built on Axum.
//!
//! Provides the chat REST endpoints, the WebSocket upgrade that feeds the
//! real-time engine, health reporting, CORS, and request tracing.

pub mod app;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
