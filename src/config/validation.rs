use crate::config::types::{
    Config, ExtractionConfig, LimitsConfig, RetentionConfig, StorageConfig, TimeoutConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound for any fan-out setting
const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_limits_config(&config.limits)?;
    validate_timeout_config(&config.timeouts)?;
    validate_retention_config(&config.retention)?;
    validate_extraction_config(&config.extraction)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download-dir cannot be empty".to_string(),
        ));
    }

    if let Some(base) = &config.public_base_url {
        let url = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid public-base-url: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "public-base-url must use http or https, got '{}'",
                base
            )));
        }
    }

    Ok(())
}

fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_file_size_mb < 1 {
        return Err(ConfigError::Validation(
            "max-file-size-mb must be >= 1".to_string(),
        ));
    }

    check_concurrency("max-concurrent-probes", config.max_concurrent_probes)?;
    check_concurrency("max-concurrent-downloads", config.max_concurrent_downloads)?;

    if config.probe_cache_capacity < 1 {
        return Err(ConfigError::Validation(
            "probe-cache-capacity must be >= 1".to_string(),
        ));
    }

    if config.probe_cache_ttl_seconds < 1 {
        return Err(ConfigError::Validation(
            "probe-cache-ttl-seconds must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn check_concurrency(name: &str, value: usize) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_CONCURRENCY, value
        )));
    }
    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    let timeouts = [
        ("page-timeout-seconds", config.page_timeout_seconds),
        ("render-timeout-seconds", config.render_timeout_seconds),
        ("probe-timeout-seconds", config.probe_timeout_seconds),
        ("download-timeout-seconds", config.download_timeout_seconds),
        ("scrape-deadline-seconds", config.scrape_deadline_seconds),
    ];

    for (name, value) in timeouts {
        if value < 1 {
            return Err(ConfigError::Validation(format!("{} must be >= 1", name)));
        }
    }

    Ok(())
}

fn validate_retention_config(config: &RetentionConfig) -> Result<(), ConfigError> {
    if config.interval_seconds < 1 {
        return Err(ConfigError::Validation(
            "retention interval-seconds must be >= 1".to_string(),
        ));
    }

    if config.ttl_seconds < 1 {
        return Err(ConfigError::Validation(
            "retention ttl-seconds must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let ext = &config.audio_extension;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "audio-extension must be non-empty and alphanumeric (no dot), got '{}'",
            ext
        )));
    }

    if !config.media_type.contains('/') {
        return Err(ConfigError::Validation(format!(
            "media-type must look like 'type/subtype', got '{}'",
            config.media_type
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}
