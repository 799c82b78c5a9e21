//! Configuration error types.

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The underlying loader failed (missing file, bad env value, ...).
    #[error("configuration load failed: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors raised while validating loaded configuration.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value is missing.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
