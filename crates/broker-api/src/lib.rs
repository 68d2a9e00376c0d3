//! # broker-api
//!
//! HTTP API layer for JobBroker built on Axum.
//!
//! Exposes the dispatch engine to submitters (`/jobs`) and runners
//! (`/runners`), plus health endpoints, with CORS and request logging.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
