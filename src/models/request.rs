use crate::models::format::TargetFormat;

/// An uploaded file as received from the request body. Request-scoped;
/// nothing here is ever persisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: Vec<u8>,
    pub media_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: Vec<u8>) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: String) -> Self {
        self.media_type = Some(media_type);
        self
    }
}

/// Raw form fields as they arrive, before any validation. Numeric fields
/// stay strings here so the Validator owns every parse decision.
#[derive(Debug, Default)]
pub struct UploadSubmission {
    pub file: Option<UploadedFile>,
    pub target_format: Option<String>,
    pub quality: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub maintain_aspect_ratio: Option<String>,
    /// Set for raw-body uploads, where no client filename exists and the
    /// extension/MIME consistency check has nothing to compare.
    pub skip_extension_check: bool,
}

/// A fully validated conversion request. Constructing one is the
/// Validator's job; the orchestrator can rely on every invariant holding.
#[derive(Debug)]
pub struct ConversionRequest {
    pub file: UploadedFile,
    pub target_format: TargetFormat,
    pub quality: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
}
