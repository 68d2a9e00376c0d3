//! # broker-storage
//!
//! Blob storage for job logfiles. Blobs are opaque byte strings keyed by a
//! [`LogfileHandle`](broker_core::types::LogfileHandle); providers store them
//! on the local filesystem or in process memory.

pub mod manager;
pub mod providers;

pub use manager::LogStoreManager;
