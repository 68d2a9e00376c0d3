//! # broker-service
//!
//! The dispatch engine. [`Scheduler`] composes the job store, the event log,
//! and the logfile store to implement every operation submitters and runners
//! call.
//!
//! Like the other services in this workspace, it receives all dependencies
//! at construction time as `Arc` references and is cheap to clone.

pub mod dispatch;

pub use dispatch::{JobCounts, Scheduler};
