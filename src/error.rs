//! Error types for Scarlet
//!
//! All modules use `ScarletResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Scarlet operations
pub type ScarletResult<T> = Result<T, ScarletError>;

/// All errors that can occur in Scarlet
#[derive(Error, Debug)]
pub enum ScarletError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Provider errors
    #[error("World provider failed for {world}: {reason}")]
    Provider { world: String, reason: String },

    #[error("World not found: {0}")]
    WorldNotFound(String),

    #[error("Timed out fetching world {world} after {secs}s")]
    FetchTimeout { world: String, secs: u64 },

    // Palette errors
    #[error("Invalid palette at {path}: {reason}")]
    PaletteInvalid { path: PathBuf, reason: String },

    // Codec errors
    #[error("Corrupt world snapshot: {0}")]
    SnapshotDecode(String),

    #[error("Invalid image request: {0}")]
    InvalidImage(String),

    #[error("Image size plan violated: {0}")]
    FormatInvariant(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScarletError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a provider failure for a world
    pub fn provider(world: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            world: world.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Provider failures are transient from the caller's point of view; a
    /// serving layer should answer them with a retryable response.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::FetchTimeout { .. })
    }

    /// Whether the error indicates a defect rather than a bad input or a
    /// flaky collaborator
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::FormatInvariant(_) | Self::Internal(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::WorldNotFound(_) => Some("Check provider.worlds_dir in your config"),
            Self::FetchTimeout { .. } => Some("Raise provider.fetch_timeout_secs or retry later"),
            Self::SnapshotDecode(_) => Some("The cached snapshot was invalidated; retry the request"),
            Self::ConfigInvalid { .. } => Some("Run: scarlet config init --force"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScarletError::WorldNotFound("PW01".to_string());
        assert!(err.to_string().contains("World not found: PW01"));
    }

    #[test]
    fn error_hint() {
        let err = ScarletError::WorldNotFound("PW01".to_string());
        assert_eq!(err.hint(), Some("Check provider.worlds_dir in your config"));
        assert!(ScarletError::Internal("x".into()).hint().is_none());
    }

    #[test]
    fn error_retryable() {
        assert!(ScarletError::provider("PW01", "socket closed").is_retryable());
        assert!(ScarletError::FetchTimeout {
            world: "PW01".into(),
            secs: 5
        }
        .is_retryable());
        assert!(!ScarletError::FormatInvariant("offset".into()).is_retryable());
    }

    #[test]
    fn error_internal() {
        assert!(ScarletError::FormatInvariant("offset".into()).is_internal());
        assert!(!ScarletError::provider("PW01", "down").is_internal());
    }
}
