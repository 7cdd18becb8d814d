//! Transport-free job control surface.

use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::broadcast;

use crate::broadcast::{JobPhase, JobProgressBroadcaster, JobProgressEvent};
use crate::config::EngineConfig;
use crate::error::{JobError, Result};
use crate::frame::{thumbnail_file_name, thumbnail_timestamps, FfmpegFrameSource, FrameSource};
use crate::job::{lock_job, Job, JobConfig, JobRegistry, JobSnapshot, JobStatus, Roi, Thumbnail};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::storage::{JobStorage, SELECTED_FRAME_FILE};
use crate::worker::{ExtractionRunner, RunRequest, WorkerPool};

pub struct JobManager {
    config: Arc<EngineConfig>,
    registry: JobRegistry,
    storage: JobStorage,
    frames: Arc<dyn FrameSource>,
    progress: JobProgressBroadcaster,
    pool: Mutex<Option<WorkerPool>>,
}

impl JobManager {
    /// Production constructor: FFmpeg frames and Tesseract OCR.
    pub fn new(config: EngineConfig) -> Self {
        let ocr = TesseractOcr::new(config.ocr.tessdata_dir.clone());
        Self::with_collaborators(config, Arc::new(FfmpegFrameSource::new()), Arc::new(ocr))
    }

    /// Builds a manager around the given frame source and OCR engine.
    pub fn with_collaborators(
        config: EngineConfig,
        frames: Arc<dyn FrameSource>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        let config = Arc::new(config);
        let storage = JobStorage::new(&config.data_dir);
        let progress = JobProgressBroadcaster::default();

        let runner = Arc::new(ExtractionRunner::new(
            Arc::clone(&config),
            Arc::clone(&frames),
            ocr,
            storage.clone(),
            progress.clone(),
        ));
        let pool = WorkerPool::new(
            runner,
            config.workers.count.max(1),
            config.workers.queue_capacity.max(1),
        );

        Self {
            config,
            registry: JobRegistry::new(),
            storage,
            frames,
            progress,
            pool: Mutex::new(Some(pool)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    /// Registers a new job for `video`: copies it into the job directory,
    /// probes the duration and stores the preview thumbnails.
    pub fn upload(&self, video: &Path) -> Result<String> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let _span = tracing::info_span!("upload", job_id = %job_id).entered();

        let video_path = self.storage.import_video(&job_id, video)?;

        let (duration, thumbnails) = match self.frames.open(&video_path) {
            Ok(mut handle) => {
                let duration = handle.duration_secs();
                let mut thumbnails = Vec::new();
                for (idx, secs) in thumbnail_timestamps(duration, &self.config.thumbnails)
                    .into_iter()
                    .enumerate()
                {
                    let frame = match handle.decode_at(secs as f64) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Job {}: no thumbnail at {}s: {}", job_id, secs, e);
                            continue;
                        }
                    };
                    let name = thumbnail_file_name(idx, secs);
                    match self.storage.write_frame(&job_id, &name, &frame) {
                        Ok(path) => thumbnails.push(Thumbnail {
                            timestamp: secs,
                            path,
                        }),
                        Err(e) => warn!("Job {}: failed to store thumbnail: {}", job_id, e),
                    }
                }
                (duration, thumbnails)
            }
            Err(e) => {
                warn!("Job {}: cannot probe video: {}", job_id, e);
                (0.0, Vec::new())
            }
        };

        info!(
            "Job {} uploaded ({:.1}s, {} thumbnails)",
            job_id,
            duration,
            thumbnails.len()
        );
        self.registry
            .insert(Job::new(job_id.clone(), video_path, duration, thumbnails));
        self.emit(&job_id, JobStatus::Uploaded, JobPhase::Uploaded, "Video uploaded");

        Ok(job_id)
    }

    /// Decodes the preview frame at `timestamp` and makes it the job's
    /// reference frame. A decode failure leaves the job untouched.
    pub fn select_frame(&self, job_id: &str, timestamp: f64) -> Result<JobSnapshot> {
        let job = self.registry.get(job_id)?;
        let video_path = lock_job(&job).video_path.clone();

        let frame = self.frames.open(&video_path)?.decode_at(timestamp)?;
        let path = self.storage.write_frame(job_id, SELECTED_FRAME_FILE, &frame)?;

        let snapshot = {
            let mut guard = lock_job(&job);
            guard.select_frame(timestamp, path);
            guard.snapshot()
        };
        info!("Job {}: frame selected at {:.2}s", job_id, timestamp);
        self.emit(
            job_id,
            JobStatus::FrameSelected,
            JobPhase::FrameSelected,
            "Preview frame selected",
        );
        Ok(snapshot)
    }

    pub fn set_roi(&self, job_id: &str, x: i64, y: i64, width: i64, height: i64) -> Result<Roi> {
        let job = self.registry.get(job_id)?;
        let roi = lock_job(&job).set_roi(x, y, width, height);

        match roi {
            Ok(roi) => {
                info!("Job {}: ROI set to {:?}", job_id, roi);
                self.emit(job_id, JobStatus::RoiSet, JobPhase::RoiSet, "Region set");
                Ok(roi)
            }
            Err(e) => {
                warn!("Job {}: rejected ROI: {}", job_id, e);
                Err(e.into())
            }
        }
    }

    pub fn reset_roi(&self, job_id: &str) -> Result<JobSnapshot> {
        let job = self.registry.get(job_id)?;
        let snapshot = {
            let mut guard = lock_job(&job);
            guard.reset_roi();
            guard.snapshot()
        };

        let phase = match snapshot.status {
            JobStatus::FrameSelected => JobPhase::FrameSelected,
            _ => JobPhase::Uploaded,
        };
        self.emit(job_id, snapshot.status, phase, "Region cleared");
        Ok(snapshot)
    }

    /// Starts a new run with `config`. Any previous run is cancelled. When the
    /// worker queue is full the job keeps its previous state.
    pub fn start(&self, job_id: &str, config: JobConfig) -> Result<()> {
        let job = self.registry.get(job_id)?;
        let pool = match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pool = pool.as_ref().ok_or(JobError::ShutDown)?;

        let mut guard = lock_job(&job);
        let ticket = guard.prepare_run();
        pool.submit(RunRequest {
            job: Arc::clone(&job),
            ticket: ticket.clone(),
        })?;
        guard.commit_run(&ticket, config);
        // Emitted under the job lock so it precedes the worker's events
        self.emit(
            job_id,
            JobStatus::Processing,
            JobPhase::Queued,
            "Queued for extraction",
        );
        drop(guard);

        info!("Job {}: run {} queued", job_id, ticket.run_id);
        Ok(())
    }

    /// Flags the active run for cancellation after its current sample.
    pub fn cancel(&self, job_id: &str) -> Result<()> {
        let job = self.registry.get(job_id)?;
        lock_job(&job).request_cancel();
        info!("Job {}: cancellation requested", job_id);
        Ok(())
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let job = self.registry.get(job_id)?;
        let snapshot = lock_job(&job).snapshot();
        Ok(snapshot)
    }

    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.registry.snapshots()
    }

    /// Contents of the job's `result.txt`.
    pub fn download_result(&self, job_id: &str) -> Result<Vec<u8>> {
        let job = self.registry.get(job_id)?;
        let result_file = lock_job(&job).result_file.clone();

        let path = result_file.ok_or_else(|| JobError::ResultNotFound(job_id.to_string()))?;
        if !path.exists() {
            return Err(JobError::ResultNotFound(job_id.to_string()).into());
        }
        Ok(self.storage.read_file(&path)?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.progress.subscribe()
    }

    /// Stops accepting runs, cancels the active ones and joins the workers.
    pub fn shutdown(&self) {
        let pool = match self.pool.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(pool) = pool {
            pool.shutdown();
            self.registry.cancel_all();
            pool.wait();
        }
    }

    fn emit(&self, job_id: &str, status: JobStatus, phase: JobPhase, message: &str) {
        self.progress
            .send(JobProgressEvent::new(job_id, status, phase, message));
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
