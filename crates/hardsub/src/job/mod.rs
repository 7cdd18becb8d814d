//! Job records, the per-job state machine and the in-memory registry.

pub mod model;
pub mod registry;

pub use model::{
    CancellationToken, Job, JobConfig, JobSnapshot, JobStatus, Progress, Roi, RunTicket,
    Thumbnail,
};
pub use registry::{lock_job, JobRegistry, SharedJob};
