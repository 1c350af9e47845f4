use axum::{
    body::Bytes,
    extract::{Multipart, Query},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::{record_rejection, record_request, REQUEST_SEMAPHORE};
use crate::models::{ConvertedImage, UploadSubmission, UploadedFile};
use crate::services::{ConversionService, Validator};

/// Multipart upload: `file` plus `targetFormat`, `quality`, `width`,
/// `height`, `maintainAspectRatio` form fields. Success is the converted
/// image as an attachment download; failure is the JSON error envelope.
pub async fn convert_handler(mut multipart: Multipart) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting image conversion request");

    record_request();
    let _permit = REQUEST_SEMAPHORE.try_acquire().map_err(|_| {
        record_rejection();
        warn!(request_id = %request_id, "Rate limit exceeded");
        AppError::RateLimitExceeded
    })?;

    debug!(request_id = %request_id, "Rate limit permit acquired");

    let submission = match read_multipart(&mut multipart).await {
        Ok(submission) => {
            if let Some(file) = submission.file.as_ref() {
                info!(
                    request_id = %request_id,
                    file_name = %file.name,
                    file_size = file.size,
                    "File extracted from multipart form"
                );
            }
            submission
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Failed to read multipart form");
            return Err(e);
        }
    };

    let output = run_conversion(submission)?;

    info!(
        request_id = %request_id,
        output_file = %output.file_name,
        output_size = output.bytes.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Request completed successfully"
    );

    Ok(download_response(output))
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub format: Option<String>,
    pub quality: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    #[serde(rename = "maintainAspectRatio")]
    pub maintain_aspect_ratio: Option<String>,
}

/// Raw-body upload: conversion parameters come from the query string and
/// the declared media type from the Content-Type header. No client
/// filename exists, so the output is named after a synthetic `upload`.
pub async fn convert_binary_handler(
    Query(params): Query<ConvertQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting binary image conversion request");

    record_request();
    let _permit = REQUEST_SEMAPHORE.try_acquire().map_err(|_| {
        record_rejection();
        warn!(request_id = %request_id, "Rate limit exceeded");
        AppError::RateLimitExceeded
    })?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.to_string());

    let mut file = UploadedFile::new("upload".to_string(), body.to_vec());
    if let Some(media_type) = content_type {
        file = file.with_media_type(media_type);
    }

    let submission = UploadSubmission {
        file: Some(file),
        target_format: params.format,
        quality: params.quality,
        width: params.width,
        height: params.height,
        maintain_aspect_ratio: params.maintain_aspect_ratio,
        skip_extension_check: true,
    };

    let output = run_conversion(submission)?;

    info!(
        request_id = %request_id,
        output_file = %output.file_name,
        output_size = output.bytes.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Binary request completed successfully"
    );

    Ok(download_response(output))
}

/// Validator then orchestrator, with one Config instance injected into
/// both. Validation failures return before the engine is ever touched.
fn run_conversion(submission: UploadSubmission) -> AppResult<ConvertedImage> {
    let config = Config::from_env().map_err(|e| AppError::config(format!("Failed to load config: {e}")))?;

    let validator = Validator::new(config.clone());
    let request = validator.validate_request(submission)?;

    let service = ConversionService::new(config);
    service.convert(request)
}

async fn read_multipart(multipart: &mut Multipart) -> AppResult<UploadSubmission> {
    let mut submission = UploadSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::MalformedUpload {
        message: format!("Failed to read multipart field: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());

                let data = field.bytes().await.map_err(|e| AppError::MalformedUpload {
                    message: format!("Failed to read file data: {}", e),
                })?;

                let mut file = UploadedFile::new(file_name, data.to_vec());
                if let Some(media_type) = content_type {
                    file = file.with_media_type(media_type);
                }
                submission.file = Some(file);
            }
            "targetFormat" | "format" => submission.target_format = Some(read_text(field).await?),
            "quality" => submission.quality = Some(read_text(field).await?),
            "width" => submission.width = Some(read_text(field).await?),
            "height" => submission.height = Some(read_text(field).await?),
            "maintainAspectRatio" => {
                submission.maintain_aspect_ratio = Some(read_text(field).await?)
            }
            _ => {
                debug!(field = %field_name, "Ignoring unknown form field");
            }
        }
    }

    Ok(submission)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field.text().await.map_err(|e| AppError::MalformedUpload {
        message: format!("Failed to read form field: {}", e),
    })
}

fn download_response(output: ConvertedImage) -> Response {
    let headers = [
        (header::CONTENT_TYPE, output.mime_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.file_name),
        ),
    ];
    (headers, output.bytes).into_response()
}
