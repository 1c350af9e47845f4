use serde::Serialize;

/// Output encodings the service can produce.
///
/// The extension and MIME mappings below are total: adding a variant
/// without extending every match is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Tiff,
    Gif,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::WebP,
        TargetFormat::Avif,
        TargetFormat::Tiff,
        TargetFormat::Gif,
    ];

    /// Parse a user-supplied format name. Unknown names yield `None`;
    /// callers map that to an `UnsupportedFormat` error.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            "tiff" | "tif" => Some(Self::Tiff),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Canonical file extension (exactly one per format).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
        }
    }

    /// MIME type for the Content-Type response header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
        }
    }
}

/// Media types accepted on upload. Everything else is rejected:
/// the gate is an allow-list, never a deny-list.
pub const ACCEPTED_INPUT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/avif",
    "image/tiff",
    "image/gif",
    "image/svg+xml",
];

pub fn is_accepted_input_type(media_type: &str) -> bool {
    ACCEPTED_INPUT_TYPES.contains(&media_type.to_lowercase().as_str())
}

/// Filename extensions considered consistent with each accepted media type.
pub fn allowed_extensions_for(media_type: &str) -> Option<&'static [&'static str]> {
    match media_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some(&["jpg", "jpeg"]),
        "image/png" => Some(&["png"]),
        "image/webp" => Some(&["webp"]),
        "image/avif" => Some(&["avif"]),
        "image/tiff" => Some(&["tif", "tiff"]),
        "image/gif" => Some(&["gif"]),
        "image/svg+xml" => Some(&["svg"]),
        _ => None,
    }
}
