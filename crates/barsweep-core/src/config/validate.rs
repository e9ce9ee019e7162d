//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        self.sweep
            .params()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("sweep.{e}")))?;
        for (i, step) in self.sweep.preprocess.iter().enumerate() {
            step.validate().map_err(|e| {
                ConfigError::ValidationError(format!("sweep.preprocess[{i}]: {e}"))
            })?;
        }
        if self.decoder.backend.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "decoder.backend must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be \"json\" or \"jsonl\", got {:?}",
                self.output.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::PreprocessStep;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_angle_step() {
        let mut config = Config::default();
        config.sweep.angle_step = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep.angle_step"));
    }

    #[test]
    fn test_validate_rejects_zero_max_angle() {
        let mut config = Config::default();
        config.sweep.max_angle = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep.max_angle"));
    }

    #[test]
    fn test_validate_rejects_even_kernel() {
        let mut config = Config::default();
        config.sweep.filter_kernel_size = 6;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filter_kernel_size"));

        config.sweep.filter_kernel_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_preprocess_step() {
        let mut config = Config::default();
        config.sweep.preprocess = vec![
            PreprocessStep::Grayscale,
            PreprocessStep::Upscale { factor: 0.0 },
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep.preprocess[1]"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_output_format() {
        let mut config = Config::default();
        config.output.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }
}
