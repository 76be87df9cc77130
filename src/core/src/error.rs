use thiserror::Error;

/// A3S App error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed service record in the application descriptor
    #[error("Service({service}) {message}")]
    InputError { service: String, message: String },

    /// Unparsable image reference or missing required tag
    #[error("Invalid image reference({reference}): {message}")]
    ReferenceError { reference: String, message: String },

    /// Engine or registry failure while resolving a digest
    #[error("Failed to resolve {reference}: {message}")]
    ResolutionError { reference: String, message: String },

    /// Filesystem walk or archive write failure
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// Entry type that cannot be stored in a bundle
    #[error("Archive error: can't tar non regular type {kind}: {path}")]
    UnsupportedEntryError { path: String, kind: String },

    /// Blob or manifest upload failure
    #[error("Publish error: {registry} - {message}")]
    PublishError { registry: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build an `InputError` for the named service.
    pub fn input(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InputError {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build a `ReferenceError` for the given reference string.
    pub fn reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ReferenceError {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Build a `ResolutionError` for the given reference string.
    pub fn resolution(reference: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ResolutionError {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Build a `PublishError` for the given registry.
    pub fn publish(registry: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::PublishError {
            registry: registry.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

/// Result type alias for A3S App operations
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let error = AppError::input("web", "missing 'image' attribute");
        assert_eq!(error.to_string(), "Service(web) missing 'image' attribute");
    }

    #[test]
    fn test_reference_error_display() {
        let error = AppError::reference("nginx", "images must be tagged. e.g nginx:stable");
        assert_eq!(
            error.to_string(),
            "Invalid image reference(nginx): images must be tagged. e.g nginx:stable"
        );
    }

    #[test]
    fn test_resolution_error_display() {
        let error = AppError::resolution("docker.io/library/nginx:stable", "manifest unknown");
        assert_eq!(
            error.to_string(),
            "Failed to resolve docker.io/library/nginx:stable: manifest unknown"
        );
    }

    #[test]
    fn test_archive_error_display() {
        let error = AppError::ArchiveError("can't stat file ./app".to_string());
        assert_eq!(error.to_string(), "Archive error: can't stat file ./app");
    }

    #[test]
    fn test_unsupported_entry_error_display() {
        let error = AppError::UnsupportedEntryError {
            path: "run/app.sock".to_string(),
            kind: "socket".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Archive error: can't tar non regular type socket: run/app.sock"
        );
    }

    #[test]
    fn test_publish_error_display() {
        let error = AppError::publish("ghcr.io", "blob upload rejected");
        assert_eq!(error.to_string(), "Publish error: ghcr.io - blob upload rejected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();
        assert!(matches!(app_error, AppError::IoError(_)));
        assert!(app_error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ invalid");
        let app_error: AppError = result.unwrap_err().into();
        assert!(matches!(app_error, AppError::SerializationError(_)));
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content:");
        let app_error: AppError = result.unwrap_err().into();
        assert!(matches!(app_error, AppError::SerializationError(_)));
    }

    #[test]
    fn test_config_error_display() {
        let error = AppError::ConfigError("unknown resolver".to_string());
        assert_eq!(error.to_string(), "Configuration error: unknown resolver");
    }
}
