use serde::{Deserialize, Serialize};

use crate::models::format::TargetFormat;

/// The successful outcome of a conversion: output bytes plus everything
/// needed to serve them as a download.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatsResponse {
    pub input: Vec<String>,
    pub output: Vec<FormatInfo>,
    pub max_file_size_mb: usize,
    pub max_dimension: u32,
    pub default_quality: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format: String,
    pub extension: String,
    pub mime_type: String,
}

impl FormatInfo {
    pub fn from_format(format: TargetFormat) -> Self {
        Self {
            format: format.name().to_string(),
            extension: format.extension().to_string(),
            mime_type: format.mime_type().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
