use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::error::JobError;
use crate::job::model::{Job, JobSnapshot};

pub type SharedJob = Arc<Mutex<Job>>;

/// Locks one job, recovering the data if a previous holder panicked.
pub fn lock_job(job: &Mutex<Job>) -> MutexGuard<'_, Job> {
    match job.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// In-memory job table. The map lock is held only for lookup and insert;
/// all field access goes through the per-job mutex.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, SharedJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) -> SharedJob {
        let id = job.id.clone();
        let shared = Arc::new(Mutex::new(job));
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        jobs.insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, id: &str) -> Result<SharedJob, JobError> {
        let jobs = match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        jobs.get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    fn all(&self) -> Vec<SharedJob> {
        let jobs = match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        jobs.values().cloned().collect()
    }

    /// Snapshots of every job, oldest first.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .all()
            .iter()
            .map(|job| lock_job(job).snapshot())
            .collect();
        snapshots.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        snapshots
    }

    /// Flags cancellation on every job's active run.
    pub fn cancel_all(&self) {
        for job in self.all() {
            lock_job(&job).request_cancel();
        }
    }

    pub fn len(&self) -> usize {
        match self.jobs.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(id: &str) -> Job {
        Job::new(id.to_string(), PathBuf::from("input.mp4"), 10.0, vec![])
    }

    #[test]
    fn test_insert_and_get() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());
        registry.insert(job("a"));

        let shared = registry.get("a").unwrap();
        assert_eq!(lock_job(&shared).id, "a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let registry = JobRegistry::new();
        match registry.get("missing") {
            Err(JobError::NotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected NotFound"),
        }
    }

    #[test]
    fn test_snapshots_sorted_by_creation() {
        let registry = JobRegistry::new();
        registry.insert(job("first"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        registry.insert(job("second"));

        let ids: Vec<String> = registry.snapshots().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_poisoned_job_lock_recovers() {
        let registry = JobRegistry::new();
        let shared = registry.insert(job("p"));

        let clone = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        assert_eq!(lock_job(&shared).id, "p");
    }
}
