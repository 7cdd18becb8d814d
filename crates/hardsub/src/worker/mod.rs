//! Background execution of extraction runs.

pub mod pool;
pub mod runner;
pub mod sampler;

pub use pool::{RunRequest, WorkerPool};
pub use runner::ExtractionRunner;
pub use sampler::sample_timestamps;
