use serde::{Deserialize, Serialize};

use crate::config::{FilterConfig, RatioThresholds};
use crate::text::normalize::{char_ratios, normalize_text};

/// Which ratio gates a job applies to recognized lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Default,
    KoreanOnly,
    IncludeEnglish,
}

impl FilterMode {
    /// Resolves the job flags; `korean_only` wins when both are set.
    pub fn from_flags(korean_only: bool, include_english: bool) -> Self {
        if korean_only {
            FilterMode::KoreanOnly
        } else if include_english {
            FilterMode::IncludeEnglish
        } else {
            FilterMode::Default
        }
    }
}

/// Drops OCR noise lines by length and character-class ratios.
#[derive(Debug, Clone)]
pub struct LineFilter {
    config: FilterConfig,
}

impl LineFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    fn thresholds(&self, mode: FilterMode) -> &RatioThresholds {
        match mode {
            FilterMode::Default => &self.config.default,
            FilterMode::KoreanOnly => &self.config.korean_only,
            FilterMode::IncludeEnglish => &self.config.include_english,
        }
    }

    /// Returns the normalized line when it passes every gate.
    pub fn accept(&self, raw: &str, mode: FilterMode) -> Option<String> {
        let line = normalize_text(raw);
        if line.chars().count() <= self.config.min_length {
            return None;
        }

        let ratios = char_ratios(&line);
        let limits = self.thresholds(mode);
        if ratios.hangul < limits.min_hangul
            || ratios.alphanumeric > limits.max_alphanumeric
            || ratios.special > limits.max_special
        {
            return None;
        }

        Some(line)
    }

    /// Splits raw OCR output into lines and keeps the accepted ones in order.
    pub fn filter_text(&self, raw: &str, mode: FilterMode) -> Vec<String> {
        raw.lines()
            .filter_map(|line| self.accept(line, mode))
            .collect()
    }
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
