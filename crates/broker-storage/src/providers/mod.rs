//! Logfile storage provider implementations.

#[cfg(feature = "local")]
pub mod local;
pub mod memory;

#[cfg(feature = "local")]
pub use local::LocalLogStore;
pub use memory::MemoryLogStore;
