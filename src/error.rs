//! Error types for channelwarden
//!
//! Only configuration problems are allowed to fail startup. Everything that
//! goes wrong while talking to the platform is folded into a per-channel
//! [`ReconciliationResult`](crate::reconcile::ReconciliationResult) instead of
//! surfacing here.

use crate::config::ValidationError;
use crate::platform::PlatformError;
use thiserror::Error;

/// Result type alias for channelwarden operations
pub type Result<T> = std::result::Result<T, WardenError>;

/// Error type for channelwarden operations
#[derive(Error, Debug)]
pub enum WardenError {
    /// Configuration errors (fatal, startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more configuration fields failed validation
    #[error("Invalid configuration: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    /// Platform binding errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl WardenError {
    /// Whether this error must abort initialization
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WardenError::Config(_)
                | WardenError::Validation(_)
                | WardenError::Io(_)
                | WardenError::Yaml(_)
        )
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
