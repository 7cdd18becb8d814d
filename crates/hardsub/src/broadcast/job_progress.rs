//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::JobStatus;

/// What the job is doing when the event is emitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Uploaded,
    FrameSelected,
    RoiSet,
    Queued,
    Sampling,
    Deduplicating,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Uploaded => write!(f, "Uploaded"),
            JobPhase::FrameSelected => write!(f, "Frame selected"),
            JobPhase::RoiSet => write!(f, "Region set"),
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Sampling => write!(f, "Sampling"),
            JobPhase::Deduplicating => write!(f, "Deduplicating"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
            JobPhase::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    /// Human-readable description of the current step.
    pub message: String,
    /// 1-based index of the sample being processed, `total` once finished.
    pub current: usize,
    /// Samples planned for the run.
    pub total: usize,
    pub timestamp: DateTime<Utc>,
    /// Lines read by OCR (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_lines: Option<usize>,
    /// Lines in the transcript (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_lines: Option<usize>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn new(job_id: &str, status: JobStatus, phase: JobPhase, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            phase,
            message: message.to_string(),
            current: 0,
            total: 0,
            timestamp: Utc::now(),
            raw_lines: None,
            cleaned_lines: None,
            error: None,
        }
    }

    pub fn sample(job_id: &str, current: usize, total: usize, timestamp_secs: f64) -> Self {
        Self {
            current,
            total,
            ..Self::new(
                job_id,
                JobStatus::Processing,
                JobPhase::Sampling,
                &format!("Sample {}/{} at {:.0}s", current, total, timestamp_secs),
            )
        }
    }

    pub fn completed(job_id: &str, total: usize, raw_lines: usize, cleaned_lines: usize) -> Self {
        Self {
            current: total,
            total,
            raw_lines: Some(raw_lines),
            cleaned_lines: Some(cleaned_lines),
            ..Self::new(
                job_id,
                JobStatus::Done,
                JobPhase::Completed,
                "Extraction completed",
            )
        }
    }

    pub fn failed(job_id: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job_id, JobStatus::Error, JobPhase::Failed, "Extraction failed")
        }
    }

    pub fn cancelled(job_id: &str, current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            ..Self::new(
                job_id,
                JobStatus::Cancelled,
                JobPhase::Cancelled,
                "Extraction cancelled",
            )
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker bound to one job.
    pub fn tracker(&self, job_id: &str) -> JobProgressTracker {
        JobProgressTracker::new(job_id, Arc::clone(&self.sender))
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Emits the events of a single job.
pub struct JobProgressTracker {
    job_id: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<JobProgressEvent>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            sender,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn update_phase(&self, status: JobStatus, phase: JobPhase, message: &str) {
        let _ = self
            .sender
            .send(JobProgressEvent::new(&self.job_id, status, phase, message));
    }

    pub fn sample(&self, current: usize, total: usize, timestamp_secs: f64) {
        let _ = self.sender.send(JobProgressEvent::sample(
            &self.job_id,
            current,
            total,
            timestamp_secs,
        ));
    }

    pub fn completed(&self, total: usize, raw_lines: usize, cleaned_lines: usize) {
        let _ = self.sender.send(JobProgressEvent::completed(
            &self.job_id,
            total,
            raw_lines,
            cleaned_lines,
        ));
    }

    pub fn failed(&self, error: &str) {
        let _ = self
            .sender
            .send(JobProgressEvent::failed(&self.job_id, error));
    }

    pub fn cancelled(&self, current: usize, total: usize) {
        let _ = self
            .sender
            .send(JobProgressEvent::cancelled(&self.job_id, current, total));
    }
}
