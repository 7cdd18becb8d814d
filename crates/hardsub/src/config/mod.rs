pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_from_yaml, validate_config};
pub use schema::{
    ComponentBounds, DedupConfig, EngineConfig, FilterConfig, HsvBand, OcrConfig,
    RatioThresholds, SamplingConfig, SegmenterConfig, ThumbnailConfig, WorkerConfig,
};
