use crate::{ConfigError, ConfigResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a URL parses and uses one of the allowed schemes
    pub fn validate_url(value: &str, field_name: &str, schemes: &[&str]) -> ConfigResult<()> {
        Self::validate_not_empty(value, field_name)?;
        let parsed = url::Url::parse(value)
            .map_err(|e| ConfigError::Validation(format!("{field_name} is not a valid URL: {e}")))?;
        if !schemes.contains(&parsed.scheme()) {
            return Err(ConfigError::Validation(format!(
                "{field_name} must use one of the schemes: {}",
                schemes.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64, field_name: &str) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if timeout_seconds > 86_400 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to 86400"
            )));
        }
        Ok(())
    }

    /// Validate that a count is positive
    pub fn validate_positive(count: u64, field_name: &str) -> ConfigResult<()> {
        if count == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        Ok(())
    }

    /// Validate that a ratio lies in [0, 1]
    pub fn validate_fraction(value: f64, field_name: &str) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be between 0.0 and 1.0"
            )));
        }
        Ok(())
    }

    /// Validate a host:port bind address
    pub fn validate_bind_address(value: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(value, field_name)?;
        let (_, port) = value.rsplit_once(':').ok_or_else(|| {
            ConfigError::Validation(format!("{field_name} must be in format host:port"))
        })?;
        let port: u16 = port.parse().map_err(|_| {
            ConfigError::Validation(format!("{field_name} port must be a valid number"))
        })?;
        if port == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} port cannot be 0"
            )));
        }
        Ok(())
    }
}
