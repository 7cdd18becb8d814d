//! Video frame access.
//!
//! The engine only needs two things from a video: its duration and an RGB
//! frame at a given second. [`FrameSource`] opens a [`VideoHandle`] that
//! provides both. The FFmpeg-backed source is compiled with the "ffmpeg"
//! feature; without it a stub is provided that refuses to open anything.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(not(feature = "ffmpeg"))]
pub mod ffmpeg_stub;

pub mod thumbnails;

use std::path::Path;

use image::RgbImage;

use crate::error::FrameError;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegFrameSource;

#[cfg(not(feature = "ffmpeg"))]
pub use ffmpeg_stub::FfmpegFrameSource;

pub use thumbnails::{thumbnail_file_name, thumbnail_timestamps};

/// Opens videos for random-access frame decoding.
pub trait FrameSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, FrameError>;
}

/// One opened video. Every operation that needs frames opens its own handle.
pub trait VideoHandle {
    /// Total duration in seconds, 0 when the container does not report one.
    fn duration_secs(&self) -> f64;

    /// Seeks to `secs` and decodes the first frame at or after it.
    fn decode_at(&mut self, secs: f64) -> Result<RgbImage, FrameError>;
}

/// Pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Copies `rect` out of `frame`.
pub fn crop(frame: &RgbImage, rect: CropRect) -> RgbImage {
    image::imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_copies_region() {
        let mut frame = RgbImage::new(10, 10);
        frame.put_pixel(4, 6, Rgb([1, 2, 3]));
        let region = crop(
            &frame,
            CropRect {
                x: 3,
                y: 5,
                width: 4,
                height: 2,
            },
        );
        assert_eq!(region.dimensions(), (4, 2));
        assert_eq!(region.get_pixel(1, 1).0, [1, 2, 3]);
    }
}
