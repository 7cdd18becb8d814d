//! Frame source used when the "ffmpeg" feature is disabled.

use std::path::Path;

use crate::error::FrameError;
use crate::frame::{FrameSource, VideoHandle};

#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSource;

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, FrameError> {
        log::warn!(
            "Cannot open {}: built without the ffmpeg feature",
            path.display()
        );
        Err(FrameError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_refuses_to_open() {
        let source = FfmpegFrameSource::new();
        let result = source.open(Path::new("/tmp/video.mp4"));
        assert!(matches!(result, Err(FrameError::Unsupported)));
    }
}
