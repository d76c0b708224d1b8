use std::path::PathBuf;

/// Result type alias for shuto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for shuto operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration document could not be parsed
    #[error("failed to parse '{path}': {message}")]
    Parse {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Environment variable related errors
    #[error("environment variable '{variable}' error: {message}")]
    Environment { variable: String, message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Domain has no configuration entry
    #[error("domain config not found for: {domain}")]
    DomainNotFound { domain: String },
}

// Helper methods for creating errors with context
impl Error {
    /// Create a parse error with a source error
    #[must_use]
    pub fn parse_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an environment variable error
    #[must_use]
    pub fn environment(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Environment {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    #[must_use]
    pub fn domain_not_found(domain: impl Into<String>) -> Self {
        Error::DomainNotFound {
            domain: domain.into(),
        }
    }
}
