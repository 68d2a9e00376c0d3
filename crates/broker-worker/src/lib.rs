//! Background tasks for JobBroker.
//!
//! This crate provides the lease reaper, which moves RUNNING jobs whose
//! runner stopped reporting to UNKNOWN so they do not stay claimed forever.

pub mod reaper;

pub use reaper::LeaseReaper;
