use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info};

use crate::error::JobError;
use crate::job::{RunTicket, SharedJob};
use crate::worker::runner::ExtractionRunner;

/// One queued extraction run.
pub struct RunRequest {
    pub job: SharedJob,
    pub ticket: RunTicket,
}

/// Fixed set of OS threads fed by a bounded queue.
pub struct WorkerPool {
    run_sender: Sender<RunRequest>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` workers sharing `runner`. A count or capacity
    /// of 0 is raised to 1.
    pub fn new(runner: Arc<ExtractionRunner>, worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (run_sender, run_receiver) = bounded::<RunRequest>(queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let run_rx = run_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_runner = Arc::clone(&runner);

            let handle = thread::Builder::new()
                .name(format!("hardsub-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, run_rx, shutdown_flag, worker_runner));

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => error!("Failed to spawn worker {}: {}", worker_id, e),
            }
        }

        info!("Started {} workers", workers.len());

        Self {
            run_sender,
            workers,
            shutdown,
        }
    }

    /// Queues a run without blocking. Fails when the queue is full or the
    /// pool is shutting down.
    pub fn submit(&self, request: RunRequest) -> Result<(), JobError> {
        if self.shutdown.load(Ordering::Relaxed) || self.workers.is_empty() {
            return Err(JobError::ShutDown);
        }

        self.run_sender.try_send(request).map_err(|e| match e {
            TrySendError::Full(request) => JobError::QueueFull(request.ticket.job_id),
            TrySendError::Disconnected(_) => JobError::ShutDown,
        })
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.run_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

fn run_worker(
    worker_id: usize,
    run_receiver: Receiver<RunRequest>,
    shutdown: Arc<AtomicBool>,
    runner: Arc<ExtractionRunner>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match run_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(request) => {
                debug!(
                    "Worker {} processing job {} (run {})",
                    worker_id, request.ticket.job_id, request.ticket.run_id
                );

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    runner.run(&request.job, &request.ticket)
                }));

                if let Err(payload) = outcome {
                    let reason = panic_message(payload.as_ref());
                    error!(
                        "Worker {} panicked while processing job {}: {}",
                        worker_id, request.ticket.job_id, reason
                    );
                    let tracker = runner.progress().tracker(&request.ticket.job_id);
                    runner.record_failure(
                        &request.job,
                        &request.ticket,
                        &tracker,
                        &format!("internal error: {}", reason),
                    );
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} run channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use image::GrayImage;
    use tempfile::TempDir;

    use crate::broadcast::JobProgressBroadcaster;
    use crate::config::EngineConfig;
    use crate::error::{FrameError, OcrError};
    use crate::frame::{FrameSource, VideoHandle};
    use crate::job::{lock_job, Job, JobConfig, JobRegistry, JobStatus};
    use crate::ocr::{OcrEngine, OcrLanguage, PageSegMode};
    use crate::storage::JobStorage;

    struct NoVideo;

    impl FrameSource for NoVideo {
        fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, FrameError> {
            Err(FrameError::Open {
                path: path.to_path_buf(),
                reason: "missing".to_string(),
            })
        }
    }

    struct PanickingVideo;

    impl FrameSource for PanickingVideo {
        fn open(&self, _path: &Path) -> Result<Box<dyn VideoHandle>, FrameError> {
            panic!("decoder exploded");
        }
    }

    struct SilentOcr;

    impl OcrEngine for SilentOcr {
        fn recognize(
            &self,
            _mask: &GrayImage,
            _language: OcrLanguage,
            _psm: PageSegMode,
        ) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    fn runner(dir: &Path, frames: Arc<dyn FrameSource>) -> Arc<ExtractionRunner> {
        Arc::new(ExtractionRunner::new(
            Arc::new(EngineConfig::default()),
            frames,
            Arc::new(SilentOcr),
            JobStorage::new(dir),
            JobProgressBroadcaster::default(),
        ))
    }

    fn queued_job(registry: &JobRegistry, id: &str) -> RunRequest {
        let job = registry.insert(Job::new(
            id.to_string(),
            PathBuf::from("input.mp4"),
            10.0,
            vec![],
        ));
        let ticket = {
            let mut guard = lock_job(&job);
            guard.set_roi(0, 0, 10, 10).unwrap();
            guard.begin_run(JobConfig::default())
        };
        RunRequest { job, ticket }
    }

    fn wait_for_terminal(job: &SharedJob) -> JobStatus {
        for _ in 0..200 {
            let status = lock_job(job).status;
            if status.is_terminal() {
                return status;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("job did not finish");
    }

    #[test]
    fn test_worker_pool_creation() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(NoVideo)), 2, 4);

        assert!(!pool.is_shutdown());
        assert_eq!(pool.worker_count(), 2);

        pool.shutdown();
        assert!(pool.is_shutdown());

        pool.wait();
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(NoVideo)), 1, 1);
        pool.shutdown();

        let registry = JobRegistry::new();
        let result = pool.submit(queued_job(&registry, "late"));
        assert!(matches!(result, Err(JobError::ShutDown)));
        pool.wait();
    }

    #[test]
    fn test_open_failure_marks_job_error() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(NoVideo)), 1, 2);
        let registry = JobRegistry::new();

        let request = queued_job(&registry, "job-open");
        let job = Arc::clone(&request.job);
        pool.submit(request).unwrap();

        assert_eq!(wait_for_terminal(&job), JobStatus::Error);
        let error = lock_job(&job).error.clone().unwrap();
        assert!(error.starts_with("cannot open video:"), "{}", error);

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_panic_is_contained() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(PanickingVideo)), 1, 2);
        let registry = JobRegistry::new();

        let first = queued_job(&registry, "job-a");
        let second = queued_job(&registry, "job-b");
        let (job_a, job_b) = (Arc::clone(&first.job), Arc::clone(&second.job));
        pool.submit(first).unwrap();
        pool.submit(second).unwrap();

        // The same thread survives the first panic and handles the second run
        assert_eq!(wait_for_terminal(&job_a), JobStatus::Error);
        assert_eq!(wait_for_terminal(&job_b), JobStatus::Error);
        assert!(lock_job(&job_a)
            .error
            .as_deref()
            .unwrap()
            .contains("decoder exploded"));

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_zero_sizes_are_raised_to_one() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(NoVideo)), 0, 0);
        assert_eq!(pool.worker_count(), 1);

        let registry = JobRegistry::new();
        let request = queued_job(&registry, "job-zero");
        let job = Arc::clone(&request.job);
        pool.submit(request).unwrap();
        assert_eq!(wait_for_terminal(&job), JobStatus::Error);

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_cancelled_before_pickup_ends_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let pool = WorkerPool::new(runner(temp_dir.path(), Arc::new(NoVideo)), 1, 2);
        let registry = JobRegistry::new();

        let request = queued_job(&registry, "job-cancelled");
        let job = Arc::clone(&request.job);
        lock_job(&job).request_cancel();
        pool.submit(request).unwrap();

        assert_eq!(wait_for_terminal(&job), JobStatus::Cancelled);
        assert!(lock_job(&job).error.is_none());

        pool.shutdown();
        pool.wait();
    }
}
