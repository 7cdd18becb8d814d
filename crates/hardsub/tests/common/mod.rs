//! Shared test utilities for hardsub integration tests.
//!
//! - `TestHarness` runs a `JobManager` against a temp data directory
//! - `ScriptedFrames` and `ScriptedOcr` stand in for FFmpeg and Tesseract

pub mod fakes;
pub mod harness;

pub use fakes::{ScriptedFrames, ScriptedOcr};
pub use harness::TestHarness;
