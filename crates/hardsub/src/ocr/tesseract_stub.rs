//! OCR engine used when the "tesseract" feature is disabled.

use image::GrayImage;

use crate::error::OcrError;
use crate::ocr::{OcrEngine, OcrLanguage, PageSegMode};

#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    tessdata_dir: Option<String>,
}

impl TesseractOcr {
    pub fn new(tessdata_dir: Option<String>) -> Self {
        Self { tessdata_dir }
    }

    pub fn tessdata_dir(&self) -> Option<&str> {
        self.tessdata_dir.as_deref()
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(
        &self,
        _mask: &GrayImage,
        _language: OcrLanguage,
        _psm: PageSegMode,
    ) -> Result<String, OcrError> {
        Err(OcrError::NotEnabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_reports_not_enabled() {
        let ocr = TesseractOcr::new(Some("/usr/share/tessdata".to_string()));
        assert_eq!(ocr.tessdata_dir(), Some("/usr/share/tessdata"));
        let result = ocr.recognize(
            &GrayImage::new(4, 4),
            OcrLanguage::Korean,
            PageSegMode::Block,
        );
        assert!(matches!(result, Err(OcrError::NotEnabled)));
    }
}
