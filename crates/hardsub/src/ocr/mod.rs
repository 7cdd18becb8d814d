//! OCR adapter.
//!
//! Tesseract is compiled in with the "tesseract" feature. When the feature is
//! disabled, a stub engine is provided that reports OCR as unavailable.

#[cfg(feature = "tesseract")]
pub mod tesseract;

#[cfg(not(feature = "tesseract"))]
pub mod tesseract_stub;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractOcr;

#[cfg(not(feature = "tesseract"))]
pub use tesseract_stub::TesseractOcr;

/// Recognizes text in a binary subtitle mask.
pub trait OcrEngine: Send + Sync {
    fn recognize(
        &self,
        mask: &GrayImage,
        language: OcrLanguage,
        psm: PageSegMode,
    ) -> Result<String, OcrError>;
}

/// Language hint passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrLanguage {
    Korean,
    KoreanEnglish,
}

impl OcrLanguage {
    pub fn from_flags(include_english: bool) -> Self {
        if include_english {
            OcrLanguage::KoreanEnglish
        } else {
            OcrLanguage::Korean
        }
    }

    /// Tesseract language code.
    pub fn code(&self) -> &'static str {
        match self {
            OcrLanguage::Korean => "kor",
            OcrLanguage::KoreanEnglish => "kor+eng",
        }
    }
}

/// Page layout hint: a uniform block of text or a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PageSegMode {
    #[default]
    Block,
    SingleLine,
}

impl PageSegMode {
    /// 7 selects single-line mode; every other value falls back to block mode.
    pub fn from_i32(value: i32) -> Self {
        match value {
            7 => PageSegMode::SingleLine,
            _ => PageSegMode::Block,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            PageSegMode::Block => 6,
            PageSegMode::SingleLine => 7,
        }
    }
}

impl From<PageSegMode> for i32 {
    fn from(mode: PageSegMode) -> Self {
        mode.as_i32()
    }
}

impl From<i32> for PageSegMode {
    fn from(value: i32) -> Self {
        PageSegMode::from_i32(value)
    }
}
