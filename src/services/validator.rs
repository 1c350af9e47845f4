use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    allowed_extensions_for, is_accepted_input_type, ConversionRequest, TargetFormat, UploadedFile,
    UploadSubmission,
};

/// Gates every inbound request before any conversion work is attempted.
/// Every check is an allow-list and server-authoritative; anything the
/// client claims is re-checked here. Pure checks, no side effects.
pub struct Validator {
    config: Config,
}

impl Validator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full gate over a raw submission and produce a typed
    /// request the orchestrator can trust.
    pub fn validate_request(&self, submission: UploadSubmission) -> AppResult<ConversionRequest> {
        self.validate_file(submission.file.as_ref())?;
        let Some(file) = submission.file else {
            return Err(AppError::MissingFile);
        };

        if !submission.skip_extension_check {
            let media_type = file.media_type.as_deref().unwrap_or("");
            self.validate_extension_matches_type(&file.name, media_type)?;
        }

        let format_raw = submission.target_format.as_deref().unwrap_or("").trim().to_string();
        let target_format = TargetFormat::parse(&format_raw)
            .ok_or(AppError::UnsupportedFormat { format: format_raw })?;

        let quality = self.validate_quality(submission.quality.as_deref())?;
        let width = self.validate_dimension("width", submission.width.as_deref())?;
        let height = self.validate_dimension("height", submission.height.as_deref())?;
        let maintain_aspect_ratio = parse_flag(submission.maintain_aspect_ratio.as_deref());

        debug!(
            file_name = %file.name,
            format = target_format.name(),
            ?quality,
            ?width,
            ?height,
            maintain_aspect_ratio,
            "Request validated"
        );

        Ok(ConversionRequest {
            file,
            target_format,
            quality,
            width,
            height,
            maintain_aspect_ratio,
        })
    }

    /// File-level checks, in order: presence, emptiness, size ceiling,
    /// media-type allow-list, name length, canonical name form.
    pub fn validate_file(&self, file: Option<&UploadedFile>) -> AppResult<()> {
        let Some(file) = file else {
            return Err(AppError::MissingFile);
        };

        if file.size == 0 {
            return Err(AppError::EmptyFile);
        }

        let limit = self.config.max_file_size_bytes();
        if file.size > limit {
            return Err(AppError::FileTooLarge {
                size: file.size / (1024 * 1024),
                limit: self.config.max_file_size_mb,
            });
        }

        let media_type = file.media_type.as_deref().unwrap_or("");
        if !is_accepted_input_type(media_type) {
            return Err(AppError::UnsupportedMediaType {
                media_type: if media_type.is_empty() {
                    "unknown".to_string()
                } else {
                    media_type.to_string()
                },
            });
        }

        if file.name.len() > self.config.max_filename_length {
            return Err(AppError::FilenameTooLong {
                length: file.name.len(),
                limit: self.config.max_filename_length,
            });
        }

        // The original name must already be in canonical sanitized form;
        // a name that sanitization would change is rejected, not repaired.
        if self.sanitize_file_name(&file.name) != file.name {
            return Err(AppError::InvalidFilename);
        }

        Ok(())
    }

    /// Canonical filename form: `[A-Za-z0-9._-]` only, no repeated or
    /// leading dots, at most the configured length. Idempotent.
    pub fn sanitize_file_name(&self, name: &str) -> String {
        let mut cleaned: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();

        while cleaned.contains("..") {
            cleaned = cleaned.replace("..", ".");
        }
        let cleaned = cleaned.trim_start_matches('.');

        cleaned.chars().take(self.config.max_filename_length).collect()
    }

    /// Quality is optional; when present it must be an integer in
    /// [1,100]. Fractional or non-numeric input fails the same way an
    /// out-of-range integer does.
    pub fn validate_quality(&self, raw: Option<&str>) -> AppResult<Option<u8>> {
        let Some(raw) = raw else { return Ok(None) };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        match trimmed.parse::<i64>() {
            Ok(q) if (1..=100).contains(&q) => Ok(Some(q as u8)),
            _ => Err(AppError::QualityOutOfRange {
                value: trimmed.to_string(),
            }),
        }
    }

    /// Width/height are optional positive integers capped by policy.
    pub fn validate_dimension(
        &self,
        field: &'static str,
        raw: Option<&str>,
    ) -> AppResult<Option<u32>> {
        let Some(raw) = raw else { return Ok(None) };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let limit = self.config.max_dimension;
        match trimmed.parse::<u64>() {
            Ok(v) if v >= 1 && v <= limit as u64 => Ok(Some(v as u32)),
            _ => Err(AppError::InvalidDimension {
                field,
                value: trimmed.to_string(),
                limit,
            }),
        }
    }

    /// The filename's extension must be consistent with the declared
    /// media type, per the fixed type→extensions table.
    pub fn validate_extension_matches_type(
        &self,
        file_name: &str,
        media_type: &str,
    ) -> AppResult<()> {
        let extension = file_name
            .rfind('.')
            .map(|i| file_name[i + 1..].to_lowercase())
            .unwrap_or_default();

        let allowed = allowed_extensions_for(media_type).unwrap_or(&[]);
        if allowed.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(AppError::ExtensionMismatch {
                extension,
                media_type: media_type.to_string(),
            })
        }
    }
}

/// Absent means true: the upload form's aspect-ratio box defaults to
/// checked, and raw-body uploads never send it.
fn parse_flag(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(v) => !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "off" | "no"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(Config::default())
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        let v = validator();
        assert_eq!(v.sanitize_file_name("my photo (1).png"), "myphoto1.png");
        assert_eq!(v.sanitize_file_name("../../etc/passwd.png"), "etcpasswd.png");
        assert_eq!(v.sanitize_file_name("...leading.png"), "leading.png");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let v = validator();
        for name in ["photo.png", "a_b-c.01.jpeg", "x.webp"] {
            let once = v.sanitize_file_name(name);
            assert_eq!(once, name);
            assert_eq!(v.sanitize_file_name(&once), once);
        }
    }

    #[test]
    fn test_parse_flag_defaults_true() {
        assert!(parse_flag(None));
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("on")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("0")));
    }
}
