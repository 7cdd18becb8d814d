//! Subtitle region segmentation: isolates bright white/yellow glyph pixels in
//! a cropped ROI and drops components whose shape cannot be text.

pub mod components;
pub mod hsv;
pub mod morphology;

use image::{GrayImage, RgbImage};

use crate::config::SegmenterConfig;

pub use components::{filter_components, label_components, Component, ResolvedBounds};
pub use hsv::{color_mask, rgb_to_hsv};

/// Both masks produced for one ROI (255 = glyph).
#[derive(Debug, Clone)]
pub struct SegmentedMask {
    /// Color-gated mask after morphological closing.
    pub closed: GrayImage,
    /// `closed` restricted to components passing the shape bounds.
    pub filtered: GrayImage,
}

impl SegmentedMask {
    pub fn is_empty(&self) -> bool {
        self.filtered.pixels().all(|p| p.0[0] == 0)
    }
}

#[derive(Debug, Clone)]
pub struct SubtitleSegmenter {
    config: SegmenterConfig,
}

impl SubtitleSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn segment(&self, roi: &RgbImage) -> SegmentedMask {
        let _span = tracing::debug_span!(
            "segment",
            width = roi.width(),
            height = roi.height()
        )
        .entered();

        let raw = color_mask(roi, &self.config);
        let closed = morphology::close(
            &raw,
            self.config.close_kernel,
            self.config.close_iterations,
        );
        let filtered = filter_components(&closed, &self.config.components);

        SegmentedMask { closed, filtered }
    }
}

impl Default for SubtitleSegmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}
