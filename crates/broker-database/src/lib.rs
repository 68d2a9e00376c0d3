//! # broker-database
//!
//! Persistence for jobs and their status events. The [`JobStore`] and
//! [`EventLog`] traits are implemented by PostgreSQL repositories and by an
//! in-memory arena; [`StoreManager`] picks one from configuration.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use provider::StoreManager;
pub use store::{EventLog, JobStore};
