use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HardsubError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("ROI must have a positive width and height (got {width}x{height})")]
    InvalidRoi { width: i64, height: i64 },

    #[error("No result available for job {0}")]
    ResultNotFound(String),

    #[error("Worker queue is full, job {0} was not started")]
    QueueFull(String),

    #[error("Job manager is shut down")]
    ShutDown,
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Cannot open video '{path}': {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Failed to decode frame at {timestamp:.2}s: {reason}")]
    Decode { timestamp: f64, reason: String },

    #[error("Video decoding is not available in this build (enable the `ffmpeg` feature)")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    Init(String),

    #[error("OCR failed: {0}")]
    Recognize(String),

    #[error("OCR is not available in this build (enable the `tesseract` feature)")]
    NotEnabled,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode image '{path}': {reason}")]
    EncodeImage { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, HardsubError>;
