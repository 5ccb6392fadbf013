//! Error handling for Soundwalk
//!
//! Load-time configuration problems exclude the offending boundary rather
//! than aborting the session; runtime audio-graph failures are surfaced to
//! the orchestrator, which keeps geometric tracking alive.

use thiserror::Error;

/// Result type alias for Soundwalk operations
pub type Result<T> = std::result::Result<T, SoundwalkError>;

/// Main error type for Soundwalk operations
#[derive(Error, Debug)]
pub enum SoundwalkError {
    // Configuration Errors
    #[error("Invalid boundary configuration: {reason}")]
    Configuration { reason: String },

    #[error("Degenerate polygon in boundary '{boundary_id}': {reason}")]
    DegeneratePolygon {
        boundary_id: String,
        reason: String,
    },

    // Position Errors
    #[error("Malformed position: lat {lat}, lng {lng}")]
    InvalidPosition { lat: f64, lng: f64 },

    // Audio Graph Errors
    #[error("Source already active: {source_id}")]
    AlreadyActive { source_id: String },

    #[error("Source not found: {source_id}")]
    NotFound { source_id: String },

    #[error("Audio source unavailable for boundary '{boundary_id}': {reason}")]
    SourceUnavailable {
        boundary_id: String,
        reason: String,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SoundwalkError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SoundwalkError::Configuration { .. } => "CONFIGURATION_ERROR",
            SoundwalkError::DegeneratePolygon { .. } => "DEGENERATE_POLYGON",
            SoundwalkError::InvalidPosition { .. } => "INVALID_POSITION",
            SoundwalkError::AlreadyActive { .. } => "ALREADY_ACTIVE",
            SoundwalkError::NotFound { .. } => "NOT_FOUND",
            SoundwalkError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            SoundwalkError::Io(_) => "IO_ERROR",
            SoundwalkError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the session running: the boundary is
    /// excluded or the event is dropped, and processing continues.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SoundwalkError::Configuration { .. } => true,
            SoundwalkError::DegeneratePolygon { .. } => true,
            SoundwalkError::InvalidPosition { .. } => true,
            SoundwalkError::NotFound { .. } => true,
            SoundwalkError::SourceUnavailable { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SoundwalkError::Configuration {
            reason: "polygon has 2 vertices".to_string(),
        };
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let err = SoundwalkError::NotFound {
            source_id: "src-1".to_string(),
        };
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_recoverable_classification() {
        let err = SoundwalkError::InvalidPosition {
            lat: f64::NAN,
            lng: 0.0,
        };
        assert!(err.is_recoverable());

        let err = SoundwalkError::AlreadyActive {
            source_id: "src-1".to_string(),
        };
        assert!(!err.is_recoverable());
    }
}
