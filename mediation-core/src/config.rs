//! Configuration for the mediation layer

use serde::{Deserialize, Serialize};

/// Mediation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediationConfig {
    /// Retry configuration
    pub retry: RetryConfig,

    /// Buffered values per availability subscriber before it lags
    pub availability_feed_capacity: usize,
}

impl Default for MediationConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            availability_feed_capacity: 64,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay (milliseconds), doubled per consecutive failure
    pub base_delay_ms: u64,

    /// Exponent cap (6 → 64 × base)
    pub max_exponent: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_exponent: 6,
        }
    }
}

impl MediationConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MediationConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = MediationConfig::default();

        if let Ok(value) = std::env::var("MEDIATION_RETRY_BASE_MS") {
            config.retry.base_delay_ms = parse_env("MEDIATION_RETRY_BASE_MS", &value)?;
        }

        if let Ok(value) = std::env::var("MEDIATION_RETRY_MAX_EXPONENT") {
            config.retry.max_exponent = parse_env("MEDIATION_RETRY_MAX_EXPONENT", &value)?;
        }

        if let Ok(value) = std::env::var("MEDIATION_FEED_CAPACITY") {
            config.availability_feed_capacity = parse_env("MEDIATION_FEED_CAPACITY", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the coordinators cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.retry.base_delay_ms == 0 {
            return Err(crate::Error::Config(
                "retry.base_delay_ms must be greater than zero".to_string(),
            ));
        }

        if self.retry.max_exponent > 20 {
            return Err(crate::Error::Config(format!(
                "retry.max_exponent must be at most 20, got {}",
                self.retry.max_exponent
            )));
        }

        if self.availability_feed_capacity == 0 {
            return Err(crate::Error::Config(
                "availability_feed_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}='{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MediationConfig::default();
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.retry.max_exponent, 6);
        assert_eq!(config.availability_feed_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_with_partial_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nbase_delay_ms = 500").unwrap();

        let config = MediationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.retry.max_exponent, 6);
        assert_eq!(config.availability_feed_capacity, 64);
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retry = 12").unwrap();

        let err = MediationConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_base() {
        let mut config = MediationConfig::default();
        config.retry.base_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u64>("MEDIATION_RETRY_BASE_MS", "soon").unwrap_err();
        assert!(err.to_string().contains("MEDIATION_RETRY_BASE_MS"));
    }
}
