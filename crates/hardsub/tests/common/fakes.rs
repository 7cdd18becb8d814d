#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{GrayImage, Rgb, RgbImage};

use hardsub::{FrameError, FrameSource, OcrEngine, OcrError, OcrLanguage, PageSegMode, VideoHandle};

/// Frame source serving synthetic frames for a video of fixed duration.
pub struct ScriptedFrames {
    duration: f64,
    width: u32,
    height: u32,
    decode_delay: Duration,
    failing: HashSet<u64>,
    fail_open: AtomicBool,
    decodes: Arc<AtomicUsize>,
}

impl ScriptedFrames {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            width: 320,
            height: 180,
            decode_delay: Duration::ZERO,
            failing: HashSet::new(),
            fail_open: AtomicBool::new(false),
            decodes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = delay;
        self
    }

    /// Decoding at any of these whole seconds fails.
    pub fn failing_at(mut self, secs: &[u64]) -> Self {
        self.failing = secs.iter().copied().collect();
        self
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for ScriptedFrames {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, FrameError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(FrameError::Open {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(Box::new(ScriptedVideo {
            duration: self.duration,
            width: self.width,
            height: self.height,
            decode_delay: self.decode_delay,
            failing: self.failing.clone(),
            decodes: Arc::clone(&self.decodes),
        }))
    }
}

struct ScriptedVideo {
    duration: f64,
    width: u32,
    height: u32,
    decode_delay: Duration,
    failing: HashSet<u64>,
    decodes: Arc<AtomicUsize>,
}

impl VideoHandle for ScriptedVideo {
    fn duration_secs(&self) -> f64 {
        self.duration
    }

    fn decode_at(&mut self, secs: f64) -> Result<RgbImage, FrameError> {
        if !self.decode_delay.is_zero() {
            std::thread::sleep(self.decode_delay);
        }
        self.decodes.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&(secs as u64)) || secs > self.duration + 1.0 {
            return Err(FrameError::Decode {
                timestamp: secs,
                reason: "scripted failure".to_string(),
            });
        }

        // Dark frame with a white caption bar in the lower third
        let mut frame = RgbImage::from_pixel(self.width, self.height, Rgb([12, 12, 20]));
        let top = self.height * 3 / 4;
        for y in top..top + 12 {
            for x in (self.width / 4..self.width * 3 / 4).step_by(9) {
                for dx in 0..5 {
                    frame.put_pixel(x + dx, y, Rgb([245, 245, 245]));
                }
            }
        }
        Ok(frame)
    }
}

/// OCR engine returning one scripted text per call, then empty strings.
pub struct ScriptedOcr {
    script: Vec<String>,
    failure: Option<String>,
    held: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<(OcrLanguage, PageSegMode)>>,
}

impl ScriptedOcr {
    pub fn new<S: AsRef<str>>(script: &[S]) -> Self {
        Self {
            script: script.iter().map(|s| s.as_ref().to_string()).collect(),
            failure: None,
            held: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self::new::<&str>(&[])
    }

    /// Every call fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Calls block after being counted until [`ScriptedOcr::release`].
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(OcrLanguage, PageSegMode)> {
        self.requests.lock().unwrap().clone()
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(
        &self,
        _image: &GrayImage,
        language: OcrLanguage,
        psm: PageSegMode,
    ) -> Result<String, OcrError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((language, psm));
        while self.held.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        if let Some(message) = &self.failure {
            return Err(OcrError::Recognize(message.clone()));
        }
        Ok(self.script.get(idx).cloned().unwrap_or_default())
    }
}
