use axum::{
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::time::SystemTime;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::get_rate_limit_metrics;
use crate::services::ConversionService;

/// Health check endpoint
pub async fn health_handler() -> AppResult<Json<Value>> {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|e| AppError::internal(format!("System clock error: {}", e)))?
        .as_secs();

    let config =
        Config::from_env().map_err(|e| AppError::config(format!("Failed to load config: {}", e)))?;
    let engine_available = ConversionService::new(config).is_available();

    let (total_requests, rejected_requests, available_permits) = get_rate_limit_metrics();

    let status = if engine_available { "healthy" } else { "degraded" };

    let response = json!({
        "status": status,
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "image_engine": engine_available
        },
        "rate_limiting": {
            "total_requests": total_requests,
            "rejected_requests": rejected_requests,
            "available_permits": available_permits
        }
    });

    info!(
        status = status,
        engine_available = engine_available,
        "Health check completed"
    );

    Ok(Json(response))
}

/// Readiness check endpoint (for Kubernetes-style probes)
pub async fn ready_handler() -> Result<StatusCode, StatusCode> {
    let available = Config::from_env()
        .map(|config| ConversionService::new(config).is_available())
        .unwrap_or(false);

    if available {
        Ok(StatusCode::OK)
    } else {
        info!("Readiness check failed - image engine unavailable");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
