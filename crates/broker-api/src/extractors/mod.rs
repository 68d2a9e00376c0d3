//! Helpers for pulling typed values out of requests.

pub mod path;

pub use path::parse_job_id;
