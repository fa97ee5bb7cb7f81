//! Error types for secret generation and rendering.

use thiserror::Error;

/// The main error type for Secret Santa operations.
///
/// Each variant corresponds to one failure kind of the pipeline. Variants
/// carry the offending field, generator, or template construct as data so
/// that callers can build operator-facing messages without re-parsing text.
#[derive(Error, Debug)]
pub enum SantaError {
    /// Invalid, missing, or out-of-range configuration value
    #[error("invalid configuration for `{field}`: {reason}")]
    Config {
        /// Name of the offending configuration field
        field: String,
        /// Human readable reason
        reason: String,
    },

    /// Generator type is not registered
    #[error("unsupported generator type: {0}")]
    UnsupportedType(String),

    /// Generator type registered twice
    #[error("generator type {0} is already registered")]
    DuplicateType(String),

    /// Two generator entries share the same name within one render pass
    #[error("duplicate generator name: {0}")]
    DuplicateName(String),

    /// Randomness or key marshaling failure
    #[error("generation failed: {0}")]
    Generation(String),

    /// Malformed PEM, CSR, certificate, or JSON input
    #[error("parse error: {0}")]
    Parse(String),

    /// CSR self-signature invalid or CA key/certificate mismatch
    #[error("chain validation failed: {0}")]
    ChainValidation(String),

    /// Template could not be parsed
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),

    /// Template uses a blocked construct
    #[error("template validation failed: {0}")]
    TemplateSecurity(#[from] SecurityViolation),

    /// Template failed while executing (strict missing-key, bad argument)
    #[error("template execution error: {0}")]
    TemplateExecution(String),

    /// A named generator failed; wraps the underlying cause
    #[error("generator {name} ({kind}) failed: {source}")]
    Generator {
        /// Generator entry name
        name: String,
        /// Generator type
        kind: String,
        /// Underlying failure
        #[source]
        source: Box<SantaError>,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SantaError {
    /// Build a [`SantaError::Config`] for `field`.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SantaError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attach the generator name and type to an error.
    pub fn in_generator(self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        SantaError::Generator {
            name: name.into(),
            kind: kind.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through [`SantaError::Generator`] wrappers.
    pub fn root_cause(&self) -> &SantaError {
        match self {
            SantaError::Generator { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A template construct rejected before parsing.
///
/// The display text of each variant is the message shown to template
/// authors, so every blocked pattern is distinguishable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityViolation {
    /// `{{.}}` or `{{$}}`
    #[error("direct root context access is not allowed")]
    RootContextAccess,

    /// `{{range .}}`
    #[error("ranging over root context is not allowed")]
    RangeOverRoot,

    /// `{{with .}}`
    #[error("with root context is not allowed")]
    WithRoot,

    /// `call` builtin
    #[error("call function is not allowed")]
    CallFunction,

    /// `js` escaper
    #[error("js function is not allowed")]
    JsFunction,

    /// `urlquery` escaper
    #[error("urlquery function is not allowed")]
    UrlQueryFunction,
}

/// A specialized Result type for Secret Santa operations.
pub type Result<T> = std::result::Result<T, SantaError>;

/// Helper macro to bail out with a SantaError
///
/// # Example
///
/// ```ignore
/// if length == 0 {
///     bail!(config "length", "must be at least 1, got {}", length);
/// }
/// bail!(Parse, "no PEM block found in {}", field);
/// ```
#[macro_export]
macro_rules! bail {
    (config $field:expr, $msg:expr) => {
        return Err($crate::SantaError::config($field, $msg))
    };
    (config $field:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::SantaError::config($field, format!($fmt, $($arg)*)))
    };
    ($variant:ident, $msg:expr) => {
        return Err($crate::SantaError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::SantaError::$variant(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_config() -> Result<()> {
        bail!(config "length", "must be between {} and {}", 1, 10000);
    }

    fn fails_parse() -> Result<()> {
        bail!(Parse, "no PEM block found");
    }

    #[test]
    fn test_bail_config() {
        let err = fails_config().unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "length"));
        assert_eq!(
            err.to_string(),
            "invalid configuration for `length`: must be between 1 and 10000"
        );
    }

    #[test]
    fn test_bail_variant() {
        let err = fails_parse().unwrap_err();
        assert_eq!(err.to_string(), "parse error: no PEM block found");
    }

    #[test]
    fn test_security_violation_messages() {
        let err: SantaError = SecurityViolation::CallFunction.into();
        assert_eq!(
            err.to_string(),
            "template validation failed: call function is not allowed"
        );
        assert_eq!(
            SecurityViolation::RangeOverRoot.to_string(),
            "ranging over root context is not allowed"
        );
    }

    #[test]
    fn test_generator_wrapper_keeps_cause() {
        let err = SantaError::config("key_size", "unsupported AES key size 100")
            .in_generator("AESKey", "crypto_aes_key");
        assert_eq!(
            err.to_string(),
            "generator AESKey (crypto_aes_key) failed: invalid configuration for `key_size`: unsupported AES key size 100"
        );
        assert!(matches!(err.root_cause(), SantaError::Config { .. }));
    }
}
