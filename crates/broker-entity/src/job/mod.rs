//! Job domain entities.

pub mod event;
pub mod model;
pub mod status;

pub use event::JobEvent;
pub use model::{Job, JobFilter, NewJob};
pub use status::JobStatus;
