use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;
use chrono;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure the service can hand back to a caller. Validation
/// variants carry enough context for a specific, user-safe message;
/// `ConversionFailed` is deliberately opaque and the underlying engine
/// error is logged server-side only.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded: maximum concurrent requests reached")]
    RateLimitExceeded,

    #[error("No file provided in request")]
    MissingFile,

    #[error("Malformed upload: {message}")]
    MalformedUpload { message: String },

    #[error("File is empty")]
    EmptyFile,

    #[error("File size exceeds {limit}MB limit")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Unsupported file type: {media_type}")]
    UnsupportedMediaType { media_type: String },

    #[error("File name is too long ({length} characters, maximum {limit})")]
    FilenameTooLong { length: usize, limit: usize },

    #[error("File name contains invalid characters")]
    InvalidFilename,

    #[error("File extension '{extension}' does not match file type {media_type}")]
    ExtensionMismatch {
        extension: String,
        media_type: String,
    },

    #[error("Quality must be an integer between 1 and 100, got '{value}'")]
    QualityOutOfRange { value: String },

    #[error("{field} must be a positive integer no greater than {limit}, got '{value}'")]
    InvalidDimension {
        field: &'static str,
        value: String,
        limit: u32,
    },

    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Image conversion failed. The file may be corrupt or use an unsupported encoding.")]
    ConversionFailed,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidApiKey => "INVALID_API_KEY",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::MissingFile => "MISSING_FILE",
            AppError::MalformedUpload { .. } => "MALFORMED_UPLOAD",
            AppError::EmptyFile => "EMPTY_FILE",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            AppError::FilenameTooLong { .. } => "FILENAME_TOO_LONG",
            AppError::InvalidFilename => "INVALID_FILENAME_CHARACTERS",
            AppError::ExtensionMismatch { .. } => "EXTENSION_MIME_MISMATCH",
            AppError::QualityOutOfRange { .. } => "QUALITY_OUT_OF_RANGE",
            AppError::InvalidDimension { .. } => "INVALID_DIMENSIONS",
            AppError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AppError::ConversionFailed => "CONVERSION_FAILED",
            AppError::ConfigError { .. } => "CONFIG_ERROR",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::MalformedUpload { .. } => StatusCode::BAD_REQUEST,
            AppError::EmptyFile => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::FilenameTooLong { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidFilename => StatusCode::BAD_REQUEST,
            AppError::ExtensionMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::QualityOutOfRange { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidDimension { .. } => StatusCode::BAD_REQUEST,
            AppError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            AppError::ConversionFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures the caller can fix by changing the input.
    pub fn is_validation_error(&self) -> bool {
        self.status_code().is_client_error()
            && !matches!(self, AppError::InvalidApiKey | AppError::RateLimitExceeded)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().to_rfc3339();

        // Structured logging with context
        tracing::error!(
            error_code = error_code,
            status_code = %status,
            request_id = %request_id,
            error_message = %message,
            "API error occurred"
        );

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
                "request_id": request_id,
                "timestamp": timestamp
            },
            "data": null
        }));

        (status, body).into_response()
    }
}

// Convert common errors to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

// Helper methods for creating specific errors
impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }
}
