//! In-memory job store.
//!
//! Used for development, ephemeral CLI runs, and tests. Nothing survives a
//! process restart.

pub mod store;

pub use store::MemoryJobStore;
