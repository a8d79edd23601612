//! Error types and handling
//!
//! Common error types used across the coach.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CameraError;
use crate::video::VideoError;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Nothing to assemble: {0}")]
    EmptyInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<CameraError> for CoachError {
    fn from(error: CameraError) -> Self {
        CoachError::Camera(error.to_string())
    }
}

impl From<VideoError> for CoachError {
    fn from(error: VideoError) -> Self {
        CoachError::Resource(error.to_string())
    }
}

/// Error response for the transport layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl CoachError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            CoachError::Validation(_) => "VALIDATION_ERROR",
            CoachError::Camera(_) => "CAMERA_ERROR",
            CoachError::Resource(_) => "RESOURCE_ERROR",
            CoachError::Conflict(_) => "CONFLICT",
            CoachError::NotFound(_) => "NOT_FOUND",
            CoachError::EmptyInput(_) => "EMPTY_INPUT",
            CoachError::InvalidState(_) => "INVALID_STATE",
            CoachError::Io(_) => "IO_ERROR",
            CoachError::Serialization(_) => "SERIALIZATION_ERROR",
            CoachError::Config(_) => "CONFIG_ERROR",
            CoachError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<CoachError> for ErrorResponse {
    fn from(error: CoachError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using CoachError
pub type CoachResult<T> = Result<T, CoachError>;
