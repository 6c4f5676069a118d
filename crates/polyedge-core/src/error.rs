//! Error types shared by every polyedge crate.

use thiserror::Error;

use crate::provider::Provider;

/// Errors raised by the platform abstraction layer.
///
/// Absent headers, cookies and keys are not errors; they are reported as
/// `None` by the accessors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A provider name has no adapter branch.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// No environment source could resolve the variable.
    #[error("Missing environment variable: {0}")]
    MissingEnvVariable(String),

    /// An adapter was registered twice under the same name.
    #[error("Adapter already registered: {0}")]
    DuplicateAdapter(String),

    /// An adapter was requested that was never registered.
    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    /// The provider has no implementation for this operation.
    #[error("{operation} is not implemented for provider {provider}")]
    NotImplemented {
        provider: Provider,
        operation: &'static str,
    },

    /// An event name outside the closed event set.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// The native object does not have the shape the provider produces.
    #[error("Native {kind} shape does not match provider {provider}")]
    NativeShapeMismatch {
        provider: Provider,
        kind: &'static str,
    },

    /// The request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request line (method, URI) could not be understood.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A response status outside the HTTP range.
    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),

    /// The body does not match its declared content type.
    #[error("Invalid body: {0}")]
    InvalidBody(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key-value backend failed.
    #[error("Key-value store error: {0}")]
    Kv(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlatformError {
    /// Shorthand for [`PlatformError::NotImplemented`].
    pub fn not_implemented(provider: Provider, operation: &'static str) -> Self {
        Self::NotImplemented {
            provider,
            operation,
        }
    }

    /// Whether the error points at a deployment defect rather than a
    /// transient condition.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedProvider(_)
                | Self::MissingEnvVariable(_)
                | Self::DuplicateAdapter(_)
                | Self::UnknownAdapter(_)
                | Self::NotImplemented { .. }
                | Self::NativeShapeMismatch { .. }
                | Self::Config(_)
        )
    }
}

/// Result alias used across the workspace.
pub type Result<T, E = PlatformError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlatformError::UnsupportedProvider("netlify".to_string());
        assert_eq!(err.to_string(), "Unsupported provider: netlify");

        let err = PlatformError::not_implemented(Provider::CloudFront, "kv get");
        assert_eq!(
            err.to_string(),
            "kv get is not implemented for provider cloudfront"
        );
    }

    #[test]
    fn test_configuration_defects() {
        assert!(PlatformError::UnsupportedProvider("x".into()).is_configuration_defect());
        assert!(PlatformError::MissingEnvVariable("X".into()).is_configuration_defect());
        assert!(!PlatformError::Kv("timeout".into()).is_configuration_defect());
        assert!(!PlatformError::InvalidBody("bad".into()).is_configuration_defect());
    }

    #[test]
    fn test_from_serde_error() {
        let err: PlatformError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PlatformError::Serialization(_)));
    }
}
