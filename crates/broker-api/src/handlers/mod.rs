//! HTTP request handlers.

pub mod health;
pub mod jobs;
pub mod logs;
pub mod runners;
