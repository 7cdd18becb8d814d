use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory holding one sub-directory per job.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Persist the pre- and post-filter masks of every sample.
    #[serde(default)]
    pub debug_artifacts: bool,
    /// Upper bound on accepted lines kept for deduplication per run.
    #[serde(default = "default_max_accumulated_lines")]
    pub max_accumulated_lines: usize,
}

fn default_data_dir() -> String {
    "uploads".to_string()
}

fn default_max_accumulated_lines() -> usize {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sampling: SamplingConfig::default(),
            workers: WorkerConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            segmenter: SegmenterConfig::default(),
            filter: FilterConfig::default(),
            dedup: DedupConfig::default(),
            ocr: OcrConfig::default(),
            debug_artifacts: false,
            max_accumulated_lines: default_max_accumulated_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Sampling horizon used when a job keeps the duration cap on.
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    2
}

fn default_max_seconds() -> u64 {
    60
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            max_seconds: default_max_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumbnail_candidates")]
    pub candidates: Vec<u64>,
    #[serde(default = "default_thumbnail_count")]
    pub max_count: usize,
}

fn default_thumbnail_candidates() -> Vec<u64> {
    vec![0, 5, 10, 20, 30, 40]
}

fn default_thumbnail_count() -> usize {
    6
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            candidates: default_thumbnail_candidates(),
            max_count: default_thumbnail_count(),
        }
    }
}

/// Inclusive HSV band in the 8-bit convention (H in 0..=180, S and V in 0..=255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBand {
    pub hue: [u8; 2],
    pub saturation: [u8; 2],
    pub value: [u8; 2],
}

impl HsvBand {
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.hue[0]..=self.hue[1]).contains(&h)
            && (self.saturation[0]..=self.saturation[1]).contains(&s)
            && (self.value[0]..=self.value[1]).contains(&v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    #[serde(default = "default_brightness")]
    pub brightness: [u8; 2],
    #[serde(default = "default_white_band")]
    pub white: HsvBand,
    #[serde(default = "default_yellow_band")]
    pub yellow: HsvBand,
    /// Side of the square structuring element used for closing.
    #[serde(default = "default_close_kernel")]
    pub close_kernel: u32,
    #[serde(default = "default_close_iterations")]
    pub close_iterations: u32,
    #[serde(default)]
    pub components: ComponentBounds,
}

fn default_brightness() -> [u8; 2] {
    [180, 255]
}

fn default_white_band() -> HsvBand {
    HsvBand {
        hue: [0, 180],
        saturation: [0, 65],
        value: [170, 255],
    }
}

fn default_yellow_band() -> HsvBand {
    HsvBand {
        hue: [15, 40],
        saturation: [45, 255],
        value: [120, 255],
    }
}

fn default_close_kernel() -> u32 {
    3
}

fn default_close_iterations() -> u32 {
    2
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            white: default_white_band(),
            yellow: default_yellow_band(),
            close_kernel: default_close_kernel(),
            close_iterations: default_close_iterations(),
            components: ComponentBounds::default(),
        }
    }
}

/// Shape gates applied to every connected component of the closed mask.
///
/// Ratios are relative to the ROI; the `*_px` fields are absolute floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentBounds {
    pub min_area_ratio: f64,
    pub min_area_px: u32,
    pub max_area_ratio: f64,
    pub min_height_ratio: f64,
    pub min_height_px: u32,
    pub max_height_ratio: f64,
    pub min_width_px: u32,
    pub max_width_ratio: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub min_fill: f64,
    pub max_fill: f64,
}

impl Default for ComponentBounds {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.00008,
            min_area_px: 12,
            max_area_ratio: 0.08,
            min_height_ratio: 0.015,
            min_height_px: 8,
            max_height_ratio: 0.35,
            min_width_px: 2,
            max_width_ratio: 0.65,
            min_aspect: 0.06,
            max_aspect: 14.0,
            min_fill: 0.08,
            max_fill: 0.95,
        }
    }
}

/// Character-class ratio gates for one filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioThresholds {
    pub min_hangul: f64,
    pub max_alphanumeric: f64,
    pub max_special: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Lines with this many characters or fewer are always dropped.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_thresholds")]
    pub default: RatioThresholds,
    #[serde(default = "korean_only_thresholds")]
    pub korean_only: RatioThresholds,
    #[serde(default = "include_english_thresholds")]
    pub include_english: RatioThresholds,
}

fn default_min_length() -> usize {
    3
}

fn default_thresholds() -> RatioThresholds {
    RatioThresholds {
        min_hangul: 0.30,
        max_alphanumeric: 0.55,
        max_special: 0.45,
    }
}

fn korean_only_thresholds() -> RatioThresholds {
    RatioThresholds {
        min_hangul: 0.45,
        max_alphanumeric: 0.35,
        max_special: 0.35,
    }
}

fn include_english_thresholds() -> RatioThresholds {
    RatioThresholds {
        min_hangul: 0.20,
        max_alphanumeric: 0.75,
        max_special: 0.45,
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            default: default_thresholds(),
            korean_only: korean_only_thresholds(),
            include_english: include_english_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    0.88
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Directory containing `*.traineddata`; the engine default when unset.
    #[serde(default)]
    pub tessdata_dir: Option<String>,
}
