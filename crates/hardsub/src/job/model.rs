use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::frame::CropRect;
use crate::ocr::{OcrLanguage, PageSegMode};
use crate::text::FilterMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    FrameSelected,
    RoiSet,
    Processing,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Uploaded => write!(f, "uploaded"),
            JobStatus::FrameSelected => write!(f, "frame_selected"),
            JobStatus::RoiSet => write!(f, "roi_set"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Region of interest in preview-frame pixels. The origin may lie outside the
/// frame; only the size is validated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roi {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Roi {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Result<Self, JobError> {
        if width <= 0 || height <= 0 {
            return Err(JobError::InvalidRoi { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Intersects the ROI with a `frame_width` x `frame_height` frame.
    /// Returns `None` when nothing of the ROI is inside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<CropRect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(frame_width as i64);
        let y1 = self.y.saturating_add(self.height).min(frame_height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(CropRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// A stored preview frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub timestamp: u64,
    pub path: PathBuf,
}

/// Options captured when a run starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    pub psm: PageSegMode,
    pub korean_only: bool,
    pub include_english: bool,
    /// Cap the sampling horizon at `sampling.max_seconds`.
    pub limit_duration: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            psm: PageSegMode::Block,
            korean_only: false,
            include_english: false,
            limit_duration: true,
        }
    }
}

impl JobConfig {
    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_flags(self.korean_only, self.include_english)
    }

    pub fn language(&self) -> OcrLanguage {
        OcrLanguage::from_flags(self.include_english)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Per-run cancellation flag shared between the job and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle the worker receives for one run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub job_id: String,
    pub run_id: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub video_path: PathBuf,
    pub duration: f64,
    pub thumbnails: Vec<Thumbnail>,
    pub selected_timestamp: Option<f64>,
    pub selected_frame: Option<PathBuf>,
    pub roi: Option<Roi>,
    pub status: JobStatus,
    pub config: JobConfig,
    pub progress: Progress,
    pub raw_line_count: usize,
    pub cleaned_line_count: usize,
    pub result_text: Option<String>,
    pub result_file: Option<PathBuf>,
    pub error: Option<String>,
    pub debug_before_filter: Option<PathBuf>,
    pub debug_after_filter: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    run_id: u64,
    cancel: CancellationToken,
}

impl Job {
    pub fn new(id: String, video_path: PathBuf, duration: f64, thumbnails: Vec<Thumbnail>) -> Self {
        let now = Utc::now();
        Self {
            id,
            video_path,
            duration,
            thumbnails,
            selected_timestamp: None,
            selected_frame: None,
            roi: None,
            status: JobStatus::Uploaded,
            config: JobConfig::default(),
            progress: Progress::default(),
            raw_line_count: 0,
            cleaned_line_count: 0,
            result_text: None,
            result_file: None,
            error: None,
            debug_before_filter: None,
            debug_after_filter: None,
            created_at: now,
            updated_at: now,
            run_id: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// True while `run_id` is the job's current run.
    pub fn is_current_run(&self, run_id: u64) -> bool {
        self.run_id == run_id
    }

    /// Flags the active run as cancelled. The worker still records the
    /// `cancelled` outcome.
    pub fn request_cancel(&mut self) {
        self.cancel.cancel();
        self.touch();
    }

    /// Cancels the active run and detaches it, so its worker exits without
    /// writing anything back.
    fn supersede_run(&mut self) {
        self.cancel.cancel();
        self.run_id += 1;
    }

    pub fn select_frame(&mut self, timestamp: f64, frame_path: PathBuf) {
        self.supersede_run();
        self.selected_timestamp = Some(timestamp);
        self.selected_frame = Some(frame_path);
        self.roi = None;
        self.error = None;
        self.status = JobStatus::FrameSelected;
        self.touch();
    }

    /// Validates and attaches an ROI. An invalid ROI is recorded as the job's
    /// error message and leaves the status untouched.
    pub fn set_roi(&mut self, x: i64, y: i64, width: i64, height: i64) -> Result<Roi, JobError> {
        let roi = match Roi::new(x, y, width, height) {
            Ok(roi) => roi,
            Err(e) => {
                self.error = Some(e.to_string());
                self.touch();
                return Err(e);
            }
        };

        self.supersede_run();
        self.roi = Some(roi);
        self.error = None;
        self.status = JobStatus::RoiSet;
        self.touch();
        Ok(roi)
    }

    pub fn reset_roi(&mut self) {
        self.supersede_run();
        self.roi = None;
        self.error = None;
        self.progress = Progress::default();
        self.raw_line_count = 0;
        self.cleaned_line_count = 0;
        self.status = if self.selected_frame.is_some() {
            JobStatus::FrameSelected
        } else {
            JobStatus::Uploaded
        };
        self.touch();
    }

    /// Ticket for the next run. Nothing changes until [`Job::commit_run`],
    /// so a run that cannot be queued leaves the job as it was.
    pub fn prepare_run(&self) -> RunTicket {
        RunTicket {
            job_id: self.id.clone(),
            run_id: self.run_id + 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Makes `ticket` the current run: the previous run is cancelled and
    /// every run output is cleared.
    pub fn commit_run(&mut self, ticket: &RunTicket, config: JobConfig) {
        self.cancel.cancel();
        self.run_id = ticket.run_id;
        self.cancel = ticket.cancel.clone();
        self.config = config;
        self.progress = Progress::default();
        self.raw_line_count = 0;
        self.cleaned_line_count = 0;
        self.result_text = None;
        self.result_file = None;
        self.error = None;
        self.debug_before_filter = None;
        self.debug_after_filter = None;
        self.status = JobStatus::Processing;
        self.touch();
    }

    pub fn begin_run(&mut self, config: JobConfig) -> RunTicket {
        let ticket = self.prepare_run();
        self.commit_run(&ticket, config);
        ticket
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            video_path: self.video_path.clone(),
            duration: self.duration,
            thumbnails: self.thumbnails.clone(),
            selected_timestamp: self.selected_timestamp,
            selected_frame: self.selected_frame.clone(),
            roi: self.roi,
            status: self.status,
            config: self.config,
            progress: self.progress,
            raw_line_count: self.raw_line_count,
            cleaned_line_count: self.cleaned_line_count,
            result_text: self.result_text.clone(),
            result_file: self.result_file.clone(),
            error: self.error.clone(),
            debug_before_filter: self.debug_before_filter.clone(),
            debug_after_filter: self.debug_after_filter.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Point-in-time copy of a job, safe to hand out of the lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub video_path: PathBuf,
    pub duration: f64,
    pub thumbnails: Vec<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_frame: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<Roi>,
    pub status: JobStatus,
    pub config: JobConfig,
    pub progress: Progress,
    pub raw_line_count: usize,
    pub cleaned_line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_before_filter: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_after_filter: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
