pub mod broadcast;
pub mod config;
pub mod error;
pub mod frame;
pub mod job;
pub mod logging;
pub mod manager;
pub mod ocr;
pub mod segment;
pub mod storage;
pub mod text;
pub mod worker;

pub use broadcast::{JobPhase, JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, EngineConfig};
pub use error::{
    ConfigError, FrameError, HardsubError, JobError, OcrError, Result, StorageError,
};
pub use frame::{FfmpegFrameSource, FrameSource, VideoHandle};
pub use job::{JobConfig, JobSnapshot, JobStatus, Roi, Thumbnail};
pub use logging::{init_tracing, LogFormat};
pub use manager::JobManager;
pub use ocr::{OcrEngine, OcrLanguage, PageSegMode, TesseractOcr};
pub use segment::{SegmentedMask, SubtitleSegmenter};
pub use text::{FilterMode, LineFilter};
