//! Integration tests: full conversion pipeline and HTTP surface

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::{get, post},
    Router,
};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tower::ServiceExt;

use pixform::{
    config::Config,
    error::{AppError, AppResult},
    handlers::{convert_binary_handler, formats_handler, health_handler},
    models::{ConvertedImage, ErrorResponse, FormatsResponse, UploadSubmission, UploadedFile},
    services::{ConversionService, Validator},
};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn png_upload(name: &str, width: u32, height: u32) -> UploadedFile {
    UploadedFile::new(name.to_string(), png_bytes(width, height))
        .with_media_type("image/png".to_string())
}

fn submission(file: UploadedFile, format: &str) -> UploadSubmission {
    UploadSubmission {
        file: Some(file),
        target_format: Some(format.to_string()),
        ..Default::default()
    }
}

/// Validator then orchestrator with the default policy, the same
/// composition the convert handlers use.
fn convert(submission: UploadSubmission) -> AppResult<ConvertedImage> {
    let config = Config::default();
    let request = Validator::new(config.clone()).validate_request(submission)?;
    ConversionService::new(config).convert(request)
}

fn app() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/formats", get(formats_handler))
        .route("/api/v1/convert/binary", post(convert_binary_handler))
}

#[test]
fn test_convert_png_to_webp() {
    let mut sub = submission(png_upload("photo.png", 300, 200), "webp");
    sub.quality = Some("90".to_string());

    let output = convert(sub).unwrap();
    assert_eq!(output.mime_type, "image/webp");
    assert!(output.file_name.ends_with(".webp"));
    assert_eq!(output.file_name, "photo.webp");
    assert_eq!(&output.bytes[0..4], b"RIFF");
}

#[test]
fn test_convert_png_to_jpeg() {
    let output = convert(submission(png_upload("scan.png", 64, 64), "jpeg")).unwrap();
    assert_eq!(output.mime_type, "image/jpeg");
    assert_eq!(output.file_name, "scan.jpg");
    assert_eq!(&output.bytes[0..2], &[0xFF, 0xD8]);
}

#[test]
fn test_oversized_upload_rejected_before_conversion() {
    let file = UploadedFile::new("big.jpg".to_string(), vec![0u8; 12 * 1024 * 1024])
        .with_media_type("image/jpeg".to_string());
    let result = convert(submission(file, "png"));

    match result {
        Err(e @ AppError::FileTooLarge { .. }) => {
            assert!(e.to_string().contains("10MB"));
        }
        other => panic!("expected FileTooLarge, got {:?}", other.map(|o| o.file_name)),
    }
}

#[test]
fn test_unknown_target_format_rejected() {
    let result = convert(submission(png_upload("photo.png", 32, 32), "bogus"));
    assert!(matches!(result, Err(AppError::UnsupportedFormat { .. })));
}

#[test]
fn test_out_of_range_quality_rejected() {
    let mut sub = submission(png_upload("photo.png", 32, 32), "jpeg");
    sub.quality = Some("150".to_string());

    let result = convert(sub);
    assert!(matches!(result, Err(AppError::QualityOutOfRange { .. })));
}

#[test]
fn test_resize_never_upscales() {
    let mut sub = submission(png_upload("photo.png", 400, 200), "jpeg");
    sub.width = Some("5000".to_string());
    sub.maintain_aspect_ratio = Some("true".to_string());

    let output = convert(sub).unwrap();
    let decoded = image::load_from_memory(&output.bytes).unwrap();
    assert_eq!(decoded.width(), 400);
    assert_eq!(decoded.height(), 200);
}

#[test]
fn test_resize_fits_inside_requested_box() {
    let mut sub = submission(png_upload("photo.png", 1000, 500), "png");
    sub.width = Some("400".to_string());
    sub.height = Some("400".to_string());

    let output = convert(sub).unwrap();
    let decoded = image::load_from_memory(&output.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 200));
}

#[test]
fn test_exact_fit_stretches_but_stays_within_source() {
    let mut sub = submission(png_upload("photo.png", 1000, 500), "png");
    sub.width = Some("300".to_string());
    sub.height = Some("300".to_string());
    sub.maintain_aspect_ratio = Some("false".to_string());

    let output = convert(sub).unwrap();
    let decoded = image::load_from_memory(&output.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 300));
}

#[test]
fn test_path_traversal_filename_rejected() {
    let file = UploadedFile::new("../../etc/passwd.png".to_string(), png_bytes(32, 32))
        .with_media_type("image/png".to_string());
    let result = convert(submission(file, "jpeg"));
    assert!(matches!(result, Err(AppError::InvalidFilename)));
}

#[test]
fn test_svg_input_is_rasterized() {
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="50" height="30"><circle cx="25" cy="15" r="10" fill="blue"/></svg>"#;
    let file = UploadedFile::new("icon.svg".to_string(), svg.to_vec())
        .with_media_type("image/svg+xml".to_string());

    let output = convert(submission(file, "png")).unwrap();
    assert_eq!(output.mime_type, "image/png");
    let decoded = image::load_from_memory(&output.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 30));
}

#[test]
fn test_webp_goes_lossless_at_max_quality() {
    let mut sub = submission(png_upload("photo.png", 40, 40), "webp");
    sub.quality = Some("100".to_string());

    let output = convert(sub).unwrap();
    assert_eq!(&output.bytes[0..4], b"RIFF");
    // Lossless WebP uses the VP8L chunk
    assert_eq!(&output.bytes[12..16], b"VP8L");
}

#[test]
fn test_corrupt_input_maps_to_generic_conversion_failure() {
    let file = UploadedFile::new("broken.png".to_string(), vec![0xDE, 0xAD, 0xBE, 0xEF])
        .with_media_type("image/png".to_string());
    let result = convert(submission(file, "jpeg"));

    match result {
        Err(e @ AppError::ConversionFailed) => {
            // Public message carries no internal detail
            assert!(!e.to_string().to_lowercase().contains("decode"));
        }
        other => panic!("expected ConversionFailed, got {:?}", other.map(|o| o.file_name)),
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["services"]["image_engine"], true);
}

#[tokio::test]
async fn test_formats_endpoint() {
    let response = app()
        .oneshot(Request::builder().uri("/api/v1/formats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let formats: FormatsResponse = serde_json::from_slice(&body).unwrap();

    assert_eq!(formats.output.len(), 6);
    assert!(formats.input.iter().any(|t| t == "image/svg+xml"));
    assert_eq!(formats.max_file_size_mb, 10);
    assert_eq!(formats.default_quality, 90);
}

#[tokio::test]
async fn test_binary_convert_endpoint() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/convert/binary?format=webp&quality=80")
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(png_bytes(60, 40)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/webp"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("upload.webp"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[0..4], b"RIFF");
}

#[tokio::test]
async fn test_binary_convert_endpoint_error_envelope() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/convert/binary?format=bogus")
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(png_bytes(8, 8)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(!envelope.success);
    assert_eq!(envelope.error.code, "UNSUPPORTED_FORMAT");
    assert!(envelope.error.message.contains("bogus"));
}
