use std::io::Write;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};

use crate::error::StorageError;

pub const SELECTED_FRAME_FILE: &str = "selected_frame.jpg";
pub const RESULT_FILE: &str = "result.txt";
pub const DEBUG_BEFORE_FILTER_FILE: &str = "debug_preprocessed_roi_before_filter.png";
pub const DEBUG_AFTER_FILTER_FILE: &str = "debug_preprocessed_roi_after_filter.png";

/// Artifact layout: one directory per job under the data directory.
#[derive(Debug, Clone)]
pub struct JobStorage {
    data_dir: PathBuf,
}

impl JobStorage {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.data_dir.join(job_id)
    }

    pub fn create_job_dir(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.job_dir(job_id);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    /// Copies the uploaded video to `input.<ext>` inside the job directory.
    pub fn import_video(&self, job_id: &str, source: &Path) -> Result<PathBuf, StorageError> {
        let dir = self.create_job_dir(job_id)?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "mp4".to_string());

        let target = dir.join(format!("input.{}", extension));
        std::fs::copy(source, &target).map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        })?;
        Ok(target)
    }

    /// Writes an RGB frame; the format follows the file extension.
    pub fn write_frame(
        &self,
        job_id: &str,
        file_name: &str,
        frame: &RgbImage,
    ) -> Result<PathBuf, StorageError> {
        let path = self.create_job_dir(job_id)?.join(file_name);
        frame.save(&path).map_err(|e| StorageError::EncodeImage {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }

    pub fn write_mask(
        &self,
        job_id: &str,
        file_name: &str,
        mask: &GrayImage,
    ) -> Result<PathBuf, StorageError> {
        let path = self.create_job_dir(job_id)?.join(file_name);
        mask.save(&path).map_err(|e| StorageError::EncodeImage {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }

    /// Writes the transcript through a temp file in the same directory and a
    /// rename, so readers never observe a partial `result.txt`.
    pub fn write_result(&self, job_id: &str, text: &str) -> Result<PathBuf, StorageError> {
        let dir = self.create_job_dir(job_id)?;
        let target = dir.join(RESULT_FILE);
        let temp = dir.join(format!(".{}.{}.tmp", RESULT_FILE, uuid::Uuid::new_v4()));

        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()
        };

        if let Err(e) = write(&temp) {
            let _ = std::fs::remove_file(&temp);
            return Err(StorageError::WriteFile {
                path: temp,
                source: e,
            });
        }

        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(StorageError::WriteFile {
                path: target,
                source: e,
            });
        }

        Ok(target)
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        std::fs::read(path).map_err(|e| StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
