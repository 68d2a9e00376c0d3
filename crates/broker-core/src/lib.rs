//! # broker-core
//!
//! Core types, configuration, and error handling for JobBroker.
//! This crate is the foundation that all other crates depend on.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
