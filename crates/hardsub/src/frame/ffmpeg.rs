//! FFmpeg-backed frame source.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{context::Input, Pixel},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    Rational,
};
use image::RgbImage;

use crate::error::FrameError;
use crate::frame::{FrameSource, VideoHandle};

/// Microseconds, the unit of container-level seeks and durations.
const AV_TIME_BASE: f64 = 1_000_000.0;

#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSource;

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, FrameError> {
        Ok(Box::new(FfmpegVideo::open(path)?))
    }
}

pub struct FfmpegVideo {
    path: PathBuf,
    input: Input,
    stream_index: usize,
    time_base: Rational,
    duration: f64,
}

impl FfmpegVideo {
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        log::debug!("Opening video: {}", path.display());

        // Safe to call repeatedly
        ffmpeg_next::init().map_err(|e| FrameError::Open {
            path: path.to_path_buf(),
            reason: format!("FFmpeg initialisation failed: {}", e),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|e| FrameError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let (stream_index, time_base) = input
            .streams()
            .best(Type::Video)
            .map(|stream| (stream.index(), stream.time_base()))
            .ok_or_else(|| FrameError::Open {
                path: path.to_path_buf(),
                reason: "no video stream".to_string(),
            })?;

        let duration_us = input.duration();
        let duration = if duration_us > 0 {
            duration_us as f64 / AV_TIME_BASE
        } else {
            0.0
        };

        log::debug!(
            "Opened video {} (stream={}, duration={:.2}s)",
            path.display(),
            stream_index,
            duration
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            time_base,
            duration,
        })
    }
}

impl VideoHandle for FfmpegVideo {
    fn duration_secs(&self) -> f64 {
        self.duration
    }

    fn decode_at(&mut self, secs: f64) -> Result<RgbImage, FrameError> {
        let path = self.path.clone();
        let fail = |reason: String| FrameError::Decode {
            timestamp: secs,
            reason: format!("{}: {}", path.display(), reason),
        };

        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or_else(|| fail("video stream disappeared".to_string()))?;
        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|e| fail(e.to_string()))?;
        let mut decoder = decoder_context
            .decoder()
            .video()
            .map_err(|e| fail(e.to_string()))?;

        let (width, height) = (decoder.width(), decoder.height());
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| fail(e.to_string()))?;

        // Land on the keyframe before the target, then decode forward
        let target = (secs.max(0.0) * AV_TIME_BASE) as i64;
        self.input
            .seek(target, ..target)
            .map_err(|e| fail(e.to_string()))?;

        let stream_index = self.stream_index;
        let time_base = self.time_base;
        let mut decoded = VideoFrame::empty();
        let mut rgb = VideoFrame::empty();
        let reached = |decoded: &VideoFrame| {
            pts_to_seconds(decoded.pts().unwrap_or(0), time_base) + 1e-3 >= secs
        };

        for (stream, packet) in self.input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|e| fail(e.to_string()))?;

            while decoder.receive_frame(&mut decoded).is_ok() {
                if reached(&decoded) {
                    scaler
                        .run(&decoded, &mut rgb)
                        .map_err(|e| fail(e.to_string()))?;
                    return frame_to_image(&rgb, width, height)
                        .ok_or_else(|| fail("bad frame buffer".to_string()));
                }
            }
        }

        // Flush the decoder
        decoder.send_eof().map_err(|e| fail(e.to_string()))?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            if reached(&decoded) {
                scaler
                    .run(&decoded, &mut rgb)
                    .map_err(|e| fail(e.to_string()))?;
                return frame_to_image(&rgb, width, height)
                    .ok_or_else(|| fail("bad frame buffer".to_string()));
            }
        }

        Err(fail("no frame at or after timestamp".to_string()))
    }
}

fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Copies an RGB24 plane into an [`RgbImage`], dropping row padding.
fn frame_to_image(frame: &VideoFrame, width: u32, height: u32) -> Option<RgbImage> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    let buffer = if stride == row_bytes {
        data.get(..row_bytes * height as usize)?.to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(data.get(start..start + row_bytes)?);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer)
}
