//! Error types for the offline asset cache.

/// Cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Invalid configuration or manifest.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Request path or URL could not be resolved.
    #[error("invalid request: {target} - {reason}")]
    InvalidRequest { target: String, reason: String },

    /// Operation not valid in the current worker state.
    #[error("lifecycle error: {message}")]
    Lifecycle { message: String },

    /// A manifest entry could not be fetched during install.
    #[error("install failed for {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    /// Stored body does not match its recorded digest.
    #[error("digest mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Storage error.
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl CacheError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Config / usage issues
            Self::Config { .. } => 1,
            Self::InvalidRequest { .. } => 1,
            Self::Lifecycle { .. } => 1,

            Self::InstallFailed { .. } => 3,

            // Integrity
            Self::DigestMismatch { .. } => 4,

            // Network/transient
            Self::Network { .. } => 5,

            Self::Storage { .. } => 6,
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: format!("{}: {}", context, err),
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
