//! # broker-entity
//!
//! Domain entity models for JobBroker. A [`job::Job`] owns an append-only
//! list of [`job::JobEvent`]s, and its current status is always derived from
//! the newest event rather than stored on the job itself.

pub mod job;
