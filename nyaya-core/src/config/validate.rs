//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.provider.max_output_tokens == 0 {
        errors.push("provider.max_output_tokens must be > 0".to_string());
    }

    if config.history.data_dir.trim().is_empty() {
        errors.push("history.data_dir must not be empty".to_string());
    }
    if config.history.max_save_attempts == 0 {
        errors.push("history.max_save_attempts must be > 0".to_string());
    }
    if config.history.retry_interval_secs == 0 {
        errors.push("history.retry_interval_secs must be > 0".to_string());
    }

    if !matches!(config.logging.format.as_str(), "text" | "json") {
        errors.push("logging.format must be one of: text, json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = Config::default();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.history.max_save_attempts = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("history.max_save_attempts"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.provider.model = "  ".to_string();
        config.logging.format = "yaml".to_string();

        let err = validate_config(&config).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("provider.model"));
        assert!(text.contains("logging.format"));
    }
}
