//! Centralized error types for the media session pipeline.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Classifies remote-adapter failures as transient or not
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses
//!
//! Per the pipeline's error handling design, only two categories of
//! `TelecallError` are meant to ever reach a caller as an `Err`: invalid
//! arguments at a library entry point, and genuinely impossible internal
//! invariant violations. Every other failure (transient remote, parse,
//! persistence, broadcast) is caught at the adapter boundary, logged, and
//! converted to `None` — see `transcription`, `insights`, and `dispatch`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the media session pipeline.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum TelecallError {
    /// An empty or otherwise malformed argument was passed to a library
    /// entry point (e.g. an empty `callID`/`streamID`). A programming error.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transcription adapter could not complete the request.
    #[error("transcription request failed: {0}")]
    Transcription(String),

    /// The insights adapter could not complete the request.
    #[error("insights request failed: {0}")]
    Insights(String),

    /// A persistence write failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// A broadcast send failed.
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// Server configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An invariant that should be impossible was violated (e.g. registry
    /// corruption). The only category meant to bubble up unconditionally.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelecallError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Transcription(_) => "transcription_failed",
            Self::Insights(_) => "insights_failed",
            Self::Persistence(_) => "persistence_failed",
            Self::Broadcast(_) => "broadcast_failed",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transcription(_) | Self::Insights(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorCode for TelecallError {
    fn code(&self) -> &'static str {
        TelecallError::code(self)
    }
}

/// Convenient Result alias for application-wide operations.
pub type TelecallResult<T> = Result<T, TelecallError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for TelecallError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
