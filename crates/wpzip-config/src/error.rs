//! Error types for run settings.

use thiserror::Error;

/// Result alias for settings validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for settings validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was empty.
    #[error("missing configuration field")]
    MissingField {
        /// Section containing the field.
        section: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: Some(value.into()),
            reason,
        }
    }

    /// Field this error refers to, as `section.field`.
    #[must_use]
    pub fn field_path(&self) -> String {
        match self {
            Self::MissingField { section, field } | Self::InvalidField { section, field, .. } => {
                format!("{section}.{field}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_constant_and_context_is_structured() {
        let err = ConfigError::invalid("connection", "port", "0", "out_of_range");
        assert_eq!(err.to_string(), "invalid configuration field");
        assert_eq!(err.field_path(), "connection.port");

        let missing = ConfigError::MissingField {
            section: "connection",
            field: "host",
        };
        assert_eq!(missing.to_string(), "missing configuration field");
        assert_eq!(missing.field_path(), "connection.host");
    }
}
