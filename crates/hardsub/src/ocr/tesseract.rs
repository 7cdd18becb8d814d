use std::io::Cursor;

use image::{DynamicImage, GrayImage};
use leptess::{LepTess, Variable};

use crate::error::OcrError;
use crate::ocr::{OcrEngine, OcrLanguage, PageSegMode};

/// Tesseract through `leptess`. A fresh engine is created per call so the
/// adapter can be shared across worker threads.
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
        mask: &GrayImage,
        language: OcrLanguage,
        psm: PageSegMode,
    ) -> Result<String, OcrError> {
        let _span = tracing::debug_span!("ocr.tesseract", lang = language.code()).entered();

        // leptess takes encoded images
        let mut png_data = Vec::new();
        DynamicImage::ImageLuma8(mask.clone())
            .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| OcrError::Recognize(format!("Failed to encode mask: {}", e)))?;

        // Engine mode stays at Tesseract's default; leptess takes no OEM
        let mut lt = LepTess::new(self.tessdata_dir(), language.code()).map_err(|e| {
            OcrError::Init(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_variable(Variable::TesseditPagesegMode, &psm.as_i32().to_string())
            .map_err(|e| OcrError::Init(format!("Failed to set page segmentation mode: {}", e)))?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| OcrError::Recognize(format!("Failed to set image for OCR: {}", e)))?;

        lt.get_utf8_text()
            .map_err(|e| OcrError::Recognize(format!("OCR failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tessdata_dir() {
        let ocr = TesseractOcr::new(None);
        assert_eq!(ocr.tessdata_dir(), None);
        let ocr = TesseractOcr::new(Some("/opt/tessdata".to_string()));
        assert_eq!(ocr.tessdata_dir(), Some("/opt/tessdata"));
    }
}
