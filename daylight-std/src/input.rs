//! Helpers for validating tool arguments produced by the model.

use daylight_plugin::PluginError;
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts any integral JSON number, including `5.0`.
pub(crate) fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "expected a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as u32)
}

pub(crate) fn parse<T: DeserializeOwned>(input: Value) -> Result<T, PluginError> {
    serde_json::from_value(input)
        .map_err(|e| PluginError::InvalidInput(format!("Invalid parameters: {}", e)))
}

pub(crate) fn check_range<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<(), PluginError> {
    if value < min || value > max {
        return Err(PluginError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

pub(crate) fn check_query(query: &str) -> Result<(), PluginError> {
    if query.is_empty() {
        return Err(PluginError::InvalidInput(
            "query must contain at least 1 character".to_string(),
        ));
    }
    Ok(())
}
