//! Test harness for isolated job manager runs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use hardsub::{EngineConfig, JobManager, JobSnapshot, JobStatus};

use super::fakes::{ScriptedFrames, ScriptedOcr};

const WAIT_LIMIT: Duration = Duration::from_secs(10);

// The manager is declared first so its workers are joined before the temp
// directory is removed.
pub struct TestHarness {
    pub manager: JobManager,
    pub frames: Arc<ScriptedFrames>,
    pub ocr: Arc<ScriptedOcr>,
    pub video: PathBuf,
    temp_dir: TempDir,
}

impl TestHarness {
    pub fn new(frames: ScriptedFrames, ocr: ScriptedOcr) -> Self {
        Self::with_config(frames, ocr, |_| {})
    }

    /// Builds a harness after letting `configure` adjust the engine config.
    pub fn with_config(
        frames: ScriptedFrames,
        ocr: ScriptedOcr,
        configure: impl FnOnce(&mut EngineConfig),
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let video = temp_dir.path().join("clip.MP4");
        std::fs::write(&video, b"not really a video").expect("Failed to write video");

        let mut config = EngineConfig::default();
        config.data_dir = temp_dir.path().join("jobs").to_string_lossy().to_string();
        config.workers.count = 2;
        configure(&mut config);

        let frames = Arc::new(frames);
        let ocr = Arc::new(ocr);
        let manager = JobManager::with_collaborators(config, frames.clone(), ocr.clone());

        Self {
            manager,
            frames,
            ocr,
            video,
            temp_dir,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Uploads the harness video and sets a caption-area ROI.
    pub fn upload_with_roi(&self) -> String {
        let id = self.manager.upload(&self.video).expect("upload failed");
        let (width, height) = self.frames.frame_size();
        self.manager
            .set_roi(&id, 0, (height * 2 / 3) as i64, width as i64, (height / 3) as i64)
            .expect("set_roi failed");
        id
    }

    pub fn status(&self, job_id: &str) -> JobSnapshot {
        self.manager.get_status(job_id).expect("unknown job")
    }

    pub fn wait_until(
        &self,
        job_id: &str,
        what: &str,
        mut done: impl FnMut(&JobSnapshot) -> bool,
    ) -> JobSnapshot {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            let snapshot = self.status(job_id);
            if done(&snapshot) {
                return snapshot;
            }
            if Instant::now() > deadline {
                panic!("timed out waiting for {}: {:?}", what, snapshot);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn wait_for_terminal(&self, job_id: &str) -> JobSnapshot {
        self.wait_until(job_id, "terminal status", |s| s.status.is_terminal())
    }

    pub fn wait_for_status(&self, job_id: &str, status: JobStatus) -> JobSnapshot {
        let snapshot = self.wait_for_terminal(job_id);
        assert_eq!(snapshot.status, status, "unexpected outcome: {:?}", snapshot);
        snapshot
    }
}
