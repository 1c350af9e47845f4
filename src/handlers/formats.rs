use axum::response::Json;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{FormatInfo, FormatsResponse, TargetFormat, ACCEPTED_INPUT_TYPES};

/// Advertise what the service accepts and produces, so the upload UI can
/// populate its pickers without hardcoding the policy.
pub async fn formats_handler() -> AppResult<Json<FormatsResponse>> {
    let config =
        Config::from_env().map_err(|e| AppError::config(format!("Failed to load config: {}", e)))?;

    Ok(Json(FormatsResponse {
        input: ACCEPTED_INPUT_TYPES.iter().map(|t| t.to_string()).collect(),
        output: TargetFormat::ALL
            .iter()
            .map(|f| FormatInfo::from_format(*f))
            .collect(),
        max_file_size_mb: config.max_file_size_mb,
        max_dimension: config.max_dimension,
        default_quality: config.default_quality,
    }))
}
