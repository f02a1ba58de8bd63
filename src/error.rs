//! Error types for module parsing and playback

/// Error type for module parsing, validation and export
#[derive(thiserror::Error, Debug)]
pub enum ModError {
    /// The module layout is internally inconsistent or truncated
    #[error("Format error: {0}")]
    Format(String),

    /// A value was outside the range accepted by the score model
    #[error("Invalid value for '{field}': got {value}, expected {expected}")]
    Validation {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
        /// Accepted range
        expected: &'static str,
    },

    /// The effect parser was used before its pitch or sample handler was set
    #[error("Effect parser is missing its {0} handler")]
    MissingHandler(&'static str),

    /// A bit-pattern string could not be compiled
    #[error("Invalid bit pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern string as registered
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Error writing the rendered audio
    #[error("Export error: {0}")]
    Export(String),
}

impl From<String> for ModError {
    fn from(s: String) -> Self {
        ModError::Format(s)
    }
}

impl From<&str> for ModError {
    fn from(s: &str) -> Self {
        ModError::Format(s.to_string())
    }
}

/// Result type for module operations
pub type Result<T> = std::result::Result<T, ModError>;
