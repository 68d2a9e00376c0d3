//! Job dispatch: submission, claiming, and status reporting.

pub mod scheduler;

pub use scheduler::{JobCounts, Scheduler};
