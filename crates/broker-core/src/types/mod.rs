//! Shared domain identifier types.

pub mod id;

pub use id::{JobId, LogfileHandle};
