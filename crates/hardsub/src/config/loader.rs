use std::path::Path;

use crate::config::schema::{EngineConfig, HsvBand, RatioThresholds};
use crate::error::ConfigError;

/// Loads and validates an engine config. `.yaml`/`.yml` files are parsed as
/// YAML, everything else as JSON.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        load_config_from_yaml(&content)
    } else {
        load_config_from_str(&content)
    }
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_yaml(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.data_dir.trim().is_empty() {
        return Err(invalid("data_dir must not be empty"));
    }

    if config.sampling.interval_seconds == 0 {
        return Err(invalid("sampling.interval_seconds must be > 0"));
    }

    if config.workers.count == 0 {
        return Err(invalid("workers.count must be > 0"));
    }
    if config.workers.queue_capacity == 0 {
        return Err(invalid("workers.queue_capacity must be > 0"));
    }

    if config.thumbnails.max_count == 0 {
        return Err(invalid("thumbnails.max_count must be > 0"));
    }

    let seg = &config.segmenter;
    if seg.brightness[0] > seg.brightness[1] {
        return Err(invalid("segmenter.brightness range is reversed"));
    }
    validate_band("segmenter.white", &seg.white)?;
    validate_band("segmenter.yellow", &seg.yellow)?;
    if seg.close_kernel == 0 || seg.close_kernel % 2 == 0 {
        return Err(invalid("segmenter.close_kernel must be odd and > 0"));
    }

    let bounds = &seg.components;
    let ordered = [
        ("area ratio", bounds.min_area_ratio, bounds.max_area_ratio),
        ("height ratio", bounds.min_height_ratio, bounds.max_height_ratio),
        ("aspect", bounds.min_aspect, bounds.max_aspect),
        ("fill", bounds.min_fill, bounds.max_fill),
    ];
    for (name, min, max) in ordered {
        if min < 0.0 || min > max {
            return Err(invalid(format!(
                "segmenter.components {} range [{}, {}] is invalid",
                name, min, max
            )));
        }
    }

    validate_thresholds("filter.default", &config.filter.default)?;
    validate_thresholds("filter.korean_only", &config.filter.korean_only)?;
    validate_thresholds("filter.include_english", &config.filter.include_english)?;

    let threshold = config.dedup.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(invalid(format!(
            "dedup.similarity_threshold must be within [0, 1], got {}",
            threshold
        )));
    }

    if config.max_accumulated_lines == 0 {
        return Err(invalid("max_accumulated_lines must be > 0"));
    }

    Ok(())
}

fn validate_band(name: &str, band: &HsvBand) -> Result<(), ConfigError> {
    if band.hue[0] > band.hue[1]
        || band.saturation[0] > band.saturation[1]
        || band.value[0] > band.value[1]
    {
        return Err(invalid(format!("{} has a reversed range", name)));
    }
    if band.hue[1] > 180 {
        return Err(invalid(format!("{} hue must be within 0..=180", name)));
    }
    Ok(())
}

fn validate_thresholds(name: &str, thresholds: &RatioThresholds) -> Result<(), ConfigError> {
    let values = [
        thresholds.min_hangul,
        thresholds.max_alphanumeric,
        thresholds.max_special,
    ];
    if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(invalid(format!("{} ratios must be within [0, 1]", name)));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.data_dir, "uploads");
        assert_eq!(config.sampling.interval_seconds, 2);
        assert_eq!(config.sampling.max_seconds, 60);
        assert_eq!(config.thumbnails.candidates, vec![0, 5, 10, 20, 30, 40]);
        assert_eq!(config.segmenter.brightness, [180, 255]);
        assert_eq!(config.segmenter.close_iterations, 2);
        assert!((config.dedup.similarity_threshold - 0.88).abs() < f64::EPSILON);
        assert!(!config.debug_artifacts);
    }

    #[test]
    fn test_load_partial_config() {
        let config_json = r#"
        {
            "data_dir": "/var/lib/hardsub",
            "sampling": { "interval_seconds": 1 },
            "workers": { "count": 4, "queue_capacity": 8 },
            "debug_artifacts": true
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.data_dir, "/var/lib/hardsub");
        assert_eq!(config.sampling.interval_seconds, 1);
        assert_eq!(config.sampling.max_seconds, 60);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.queue_capacity, 8);
        assert!(config.debug_artifacts);
    }

    #[test]
    fn test_load_yaml_config() {
        let yaml = r#"
data_dir: jobs
segmenter:
  yellow:
    hue: [10, 45]
    saturation: [40, 255]
    value: [120, 255]
  components:
    max_fill: 0.9
filter:
  korean_only:
    min_hangul: 0.5
    max_alphanumeric: 0.3
    max_special: 0.3
"#;

        let config = load_config_from_yaml(yaml).unwrap();
        assert_eq!(config.data_dir, "jobs");
        assert_eq!(config.segmenter.yellow.hue, [10, 45]);
        assert!((config.segmenter.components.max_fill - 0.9).abs() < f64::EPSILON);
        // Unset component bounds keep their defaults
        assert_eq!(config.segmenter.components.min_area_px, 12);
        assert!((config.filter.korean_only.min_hangul - 0.5).abs() < f64::EPSILON);
        assert!((config.filter.default.min_hangul - 0.30).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = load_config_from_str(r#"{ "sampling": { "interval_seconds": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = load_config_from_str(r#"{ "workers": { "count": 0 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_similarity_rejected() {
        let result = load_config_from_str(r#"{ "dedup": { "similarity_threshold": 1.5 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reversed_band_rejected() {
        let config_json = r#"
        {
            "segmenter": {
                "white": { "hue": [0, 180], "saturation": [65, 0], "value": [170, 255] }
            }
        }
        "#;
        assert!(load_config_from_str(config_json).is_err());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let result = load_config_from_str(r#"{ "segmenter": { "close_kernel": 4 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/hardsub.yaml");
        match result {
            Err(ConfigError::ReadFile { path, .. }) => {
                assert_eq!(path.to_str().unwrap(), "/nonexistent/hardsub.yaml");
            }
            _ => panic!("Expected ReadFile error for missing config"),
        }
    }
}
