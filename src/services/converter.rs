use std::time::Instant;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ConversionRequest, ConvertedImage};
use crate::services::engine::{EncodeOptions, ImageEngine, ResizeFit};

/// Turns a validated request into normalized engine options, runs the
/// conversion, and packages the outcome. Single-shot and stateless; a
/// failure is terminal for the request.
pub struct ConversionService {
    config: Config,
    engine: ImageEngine,
}

impl ConversionService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: ImageEngine::new(),
        }
    }

    pub fn convert(&self, request: ConversionRequest) -> AppResult<ConvertedImage> {
        let start = Instant::now();
        let format = request.target_format;

        // Format membership in the supported set is carried by the type:
        // TargetFormat is a closed enum, and the encoder's match over it
        // is exhaustive, so an unmapped format cannot reach this point.
        let options = EncodeOptions {
            format,
            quality: request.quality.unwrap_or(self.config.default_quality),
            width: request.width,
            height: request.height,
            fit: if request.maintain_aspect_ratio {
                ResizeFit::Inside
            } else {
                ResizeFit::Exact
            },
        };

        info!(
            file_name = %request.file.name,
            input_size = request.file.size,
            format = format.name(),
            quality = options.quality,
            "Starting image conversion"
        );

        let bytes = self
            .engine
            .transform(
                &request.file.content,
                request.file.media_type.as_deref(),
                &options,
            )
            .map_err(|e| {
                // The engine error stays server-side; the caller only
                // sees the generic conversion failure.
                error!(
                    file_name = %request.file.name,
                    format = format.name(),
                    error = %e,
                    "Image conversion failed"
                );
                AppError::ConversionFailed
            })?;

        let file_name = output_file_name(&request.file.name, format.extension());
        let result = ConvertedImage {
            bytes,
            file_name,
            mime_type: format.mime_type(),
        };

        info!(
            file_name = %result.file_name,
            output_size = result.bytes.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Image conversion completed"
        );

        Ok(result)
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }
}

/// Replace the source extension with the canonical one for the target
/// format. A name with no stem falls back to `converted`.
fn output_file_name(source_name: &str, extension: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(i) => &source_name[..i],
        None => source_name,
    };
    let stem = if stem.is_empty() { "converted" } else { stem };
    format!("{}.{}", stem, extension)
}
