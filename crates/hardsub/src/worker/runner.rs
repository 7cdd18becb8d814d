use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::broadcast::{JobPhase, JobProgressBroadcaster, JobProgressTracker};
use crate::config::EngineConfig;
use crate::frame::{self, FrameSource, VideoHandle};
use crate::job::{lock_job, JobConfig, JobStatus, Progress, Roi, RunTicket, SharedJob};
use crate::ocr::OcrEngine;
use crate::segment::{SegmentedMask, SubtitleSegmenter};
use crate::storage::{JobStorage, DEBUG_AFTER_FILTER_FILE, DEBUG_BEFORE_FILTER_FILE};
use crate::text::{normalize_text, LineDeduplicator, LineFilter};
use crate::worker::sampler::sample_timestamps;

/// Executes one extraction run: sample, segment, OCR, filter, dedupe, write.
pub struct ExtractionRunner {
    config: Arc<EngineConfig>,
    frames: Arc<dyn FrameSource>,
    ocr: Arc<dyn OcrEngine>,
    storage: JobStorage,
    segmenter: SubtitleSegmenter,
    filter: LineFilter,
    progress: JobProgressBroadcaster,
}

/// Why a run stopped before producing a transcript.
enum Halt {
    /// Another run took over the job; nothing is written.
    Superseded,
    Cancelled,
    Failed(String),
}

/// Lines collected while sampling.
#[derive(Default)]
struct Accumulator {
    raw_lines: usize,
    accepted: Vec<String>,
    capped: bool,
}

impl ExtractionRunner {
    pub fn new(
        config: Arc<EngineConfig>,
        frames: Arc<dyn FrameSource>,
        ocr: Arc<dyn OcrEngine>,
        storage: JobStorage,
        progress: JobProgressBroadcaster,
    ) -> Self {
        let segmenter = SubtitleSegmenter::new(config.segmenter.clone());
        let filter = LineFilter::new(config.filter.clone());
        Self {
            config,
            frames,
            ocr,
            storage,
            segmenter,
            filter,
            progress,
        }
    }

    /// Runs the extraction for `ticket` and records the outcome on the job,
    /// unless the run has been superseded in the meantime.
    pub fn run(&self, job: &SharedJob, ticket: &RunTicket) {
        let _run_span = info_span!("extraction",
            job_id = %ticket.job_id,
            run_id = ticket.run_id,
        )
        .entered();
        let tracker = self.progress.tracker(&ticket.job_id);

        match self.execute(job, ticket, &tracker) {
            Ok(()) => {}
            Err(Halt::Superseded) => {
                debug!("Run {} of job {} superseded", ticket.run_id, ticket.job_id);
            }
            Err(Halt::Cancelled) => {
                info!("Job {} cancelled", ticket.job_id);
            }
            Err(Halt::Failed(message)) => {
                self.record_failure(job, ticket, &tracker, &message);
            }
        }
    }

    /// Marks the run as failed if it is still current. A run whose
    /// cancellation was requested ends as cancelled instead.
    pub fn record_failure(
        &self,
        job: &SharedJob,
        ticket: &RunTicket,
        tracker: &JobProgressTracker,
        message: &str,
    ) {
        let mut guard = lock_job(job);
        if !guard.is_current_run(ticket.run_id) {
            return;
        }
        if ticket.cancel.is_cancelled() {
            info!(
                "Job {} cancelled (discarding failure: {})",
                ticket.job_id, message
            );
            guard.status = JobStatus::Cancelled;
            guard.touch();
            let Progress { current, total } = guard.progress;
            drop(guard);
            tracker.cancelled(current, total);
            return;
        }
        tracing::error!("Job {} failed: {}", ticket.job_id, message);
        guard.status = JobStatus::Error;
        guard.error = Some(message.to_string());
        guard.touch();
        drop(guard);
        tracker.failed(message);
    }

    pub fn progress(&self) -> &JobProgressBroadcaster {
        &self.progress
    }

    fn execute(
        &self,
        job: &SharedJob,
        ticket: &RunTicket,
        tracker: &JobProgressTracker,
    ) -> Result<(), Halt> {
        self.checkpoint(job, ticket, tracker, None)?;
        let (video_path, roi, job_config) = {
            let guard = lock_job(job);
            (guard.video_path.clone(), guard.roi, guard.config)
        };

        let roi = roi.ok_or_else(|| Halt::Failed("no ROI set".to_string()))?;

        let mut video = self
            .frames
            .open(&video_path)
            .map_err(|e| Halt::Failed(format!("cannot open video: {}", e)))?;

        let cap = job_config
            .limit_duration
            .then_some(self.config.sampling.max_seconds);
        let samples = sample_timestamps(
            video.duration_secs(),
            self.config.sampling.interval_seconds,
            cap,
        );
        let total = samples.len();
        info!(
            "Job {}: sampling {} frames (duration {:.1}s)",
            ticket.job_id,
            total,
            video.duration_secs()
        );

        {
            let mut guard = lock_job(job);
            if !guard.is_current_run(ticket.run_id) {
                return Err(Halt::Superseded);
            }
            guard.progress = Progress { current: 0, total };
            guard.touch();
        }
        tracker.update_phase(JobStatus::Processing, JobPhase::Sampling, "Sampling frames");

        let mut acc = Accumulator::default();
        for (idx, &secs) in samples.iter().enumerate() {
            let current = idx + 1;
            self.checkpoint(job, ticket, tracker, Some(current))?;
            tracker.sample(current, total, secs as f64);
            debug!("Job {}: frame {}/{} at {}s", ticket.job_id, current, total, secs);

            let _sample_span = info_span!("sample", index = current, secs).entered();
            let Some(mask) = self.segment_sample(video.as_mut(), roi, secs as f64, &ticket.job_id)
            else {
                continue;
            };

            if self.config.debug_artifacts {
                self.write_debug_masks(job, ticket, &mask);
            }

            let text = {
                let _step = info_span!("ocr").entered();
                self.ocr
                    .recognize(&mask.filtered, job_config.language(), job_config.psm)
                    .map_err(|e| Halt::Failed(e.to_string()))?
            };

            self.accumulate(&text, &job_config, &mut acc, &ticket.job_id);
        }

        let transcript = {
            let _step = info_span!("deduplicate", lines = acc.accepted.len()).entered();
            tracker.update_phase(
                JobStatus::Processing,
                JobPhase::Deduplicating,
                "Removing duplicate lines",
            );
            let mut dedup = LineDeduplicator::new(self.config.dedup.similarity_threshold);
            for line in &acc.accepted {
                dedup.push(line);
            }
            dedup.into_lines()
        };

        let cleaned = transcript.len();
        let text = transcript.join("\n");

        self.checkpoint(job, ticket, tracker, None)?;
        let result_path = self
            .storage
            .write_result(&ticket.job_id, &text)
            .map_err(|e| Halt::Failed(e.to_string()))?;

        let mut guard = lock_job(job);
        if !guard.is_current_run(ticket.run_id) {
            return Err(Halt::Superseded);
        }
        if ticket.cancel.is_cancelled() {
            guard.status = JobStatus::Cancelled;
            guard.touch();
            let current = guard.progress.current;
            drop(guard);
            tracker.cancelled(current, total);
            return Err(Halt::Cancelled);
        }
        guard.status = JobStatus::Done;
        guard.progress = Progress {
            current: total,
            total,
        };
        guard.raw_line_count = acc.raw_lines;
        guard.cleaned_line_count = cleaned;
        guard.result_text = Some(text);
        guard.result_file = Some(result_path);
        guard.touch();
        drop(guard);

        info!(
            "Job {} done: {} raw lines, {} transcript lines",
            ticket.job_id, acc.raw_lines, cleaned
        );
        tracker.completed(total, acc.raw_lines, cleaned);
        Ok(())
    }

    /// Checks supersession and cancellation under the job lock, then records
    /// `current` as the sample being processed.
    fn checkpoint(
        &self,
        job: &SharedJob,
        ticket: &RunTicket,
        tracker: &JobProgressTracker,
        current: Option<usize>,
    ) -> Result<(), Halt> {
        let mut guard = lock_job(job);
        if !guard.is_current_run(ticket.run_id) {
            return Err(Halt::Superseded);
        }
        if ticket.cancel.is_cancelled() {
            guard.status = JobStatus::Cancelled;
            guard.touch();
            let Progress { current, total } = guard.progress;
            drop(guard);
            tracker.cancelled(current, total);
            return Err(Halt::Cancelled);
        }
        if let Some(current) = current {
            guard.progress.current = current;
            guard.touch();
        }
        Ok(())
    }

    /// Decodes, crops and segments one sample. `None` skips the sample.
    fn segment_sample(
        &self,
        video: &mut dyn VideoHandle,
        roi: Roi,
        secs: f64,
        job_id: &str,
    ) -> Option<SegmentedMask> {
        let frame = {
            let _step = info_span!("decode").entered();
            match video.decode_at(secs) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Job {}: frame read failed at {}s: {}", job_id, secs, e);
                    return None;
                }
            }
        };

        let Some(rect) = roi.clamp_to(frame.width(), frame.height()) else {
            warn!(
                "Job {}: ROI {:?} lies outside the {}x{} frame at {}s",
                job_id,
                roi,
                frame.width(),
                frame.height(),
                secs
            );
            return None;
        };

        let cropped = frame::crop(&frame, rect);
        Some(self.segmenter.segment(&cropped))
    }

    fn write_debug_masks(&self, job: &SharedJob, ticket: &RunTicket, mask: &SegmentedMask) {
        let before = self
            .storage
            .write_mask(&ticket.job_id, DEBUG_BEFORE_FILTER_FILE, &mask.closed);
        let after = self
            .storage
            .write_mask(&ticket.job_id, DEBUG_AFTER_FILTER_FILE, &mask.filtered);

        match (before, after) {
            (Ok(before), Ok(after)) => {
                let mut guard = lock_job(job);
                if guard.is_current_run(ticket.run_id) {
                    guard.debug_before_filter = Some(before);
                    guard.debug_after_filter = Some(after);
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Job {}: failed to write debug masks: {}", ticket.job_id, e);
            }
        }
    }

    fn accumulate(&self, text: &str, job_config: &JobConfig, acc: &mut Accumulator, job_id: &str) {
        acc.raw_lines += text
            .lines()
            .filter(|line| !normalize_text(line).is_empty())
            .count();

        let accepted = self.filter.filter_text(text, job_config.filter_mode());
        if accepted.is_empty() {
            return;
        }
        debug!("Job {}: {} lines accepted", job_id, accepted.len());

        let room = self
            .config
            .max_accumulated_lines
            .saturating_sub(acc.accepted.len());
        if accepted.len() > room && !acc.capped {
            warn!(
                "Job {}: reached {} accumulated lines, ignoring further lines",
                job_id, self.config.max_accumulated_lines
            );
            acc.capped = true;
        }
        acc.accepted.extend(accepted.into_iter().take(room));
    }
}
