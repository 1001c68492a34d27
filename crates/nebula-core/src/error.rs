//! Error types for Nebula

use thiserror::Error;

/// The main error type for Nebula operations.
///
/// Only construction and configuration paths produce these; the per-frame
/// simulation degrades silently instead of failing.
#[derive(Debug, Error)]
pub enum NebulaError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),
}

/// Result type alias for Nebula operations
pub type Result<T> = std::result::Result<T, NebulaError>;

impl From<toml::de::Error> for NebulaError {
    fn from(err: toml::de::Error) -> Self {
        NebulaError::TomlParseError(err.to_string())
    }
}

impl NebulaError {
    /// Shorthand for a range violation on a named configuration field
    pub fn out_of_range(field: &str, min: f64, max: f64, value: f64) -> Self {
        NebulaError::ValueOutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_field() {
        let err = NebulaError::out_of_range("smoke.lifetime", 0.0, 60.0, -1.0);
        let msg = err.to_string();
        assert!(msg.contains("smoke.lifetime"));
        assert!(msg.contains("-1"));
    }

    #[test]
    fn toml_error_converts() {
        let bad: std::result::Result<toml::value::Table, _> = toml::from_str("a = [");
        let err: NebulaError = bad.unwrap_err().into();
        assert!(matches!(err, NebulaError::TomlParseError(_)));
    }
}
