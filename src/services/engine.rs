use std::io::Cursor;

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use thiserror::Error;

use crate::models::TargetFormat;

/// Sources with more pixels than this are refused before any resize or
/// encode work (decompression-bomb guard).
const MAX_SOURCE_PIXELS: u64 = 1_000_000_000;

/// How requested dimensions are applied to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFit {
    /// Scale to fit inside the requested box, preserving aspect ratio.
    Inside,
    /// Stretch to the requested box exactly.
    Exact,
}

/// Normalized options for one transformation. Quality is already
/// defaulted by the orchestrator; dimensions are already range-checked
/// by the Validator. Upscaling never happens in either fit mode.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub format: TargetFormat,
    pub quality: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: ResizeFit,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("source resolution too large ({width}x{height})")]
    ResolutionTooLarge { width: u32, height: u32 },

    #[error("processing failed: {0}")]
    Processing(String),
}

/// The single hard external boundary of the service: raw bytes plus an
/// options record in, encoded bytes out. Everything behind this struct
/// is the image-processing ecosystem; nothing in front of it touches
/// pixels.
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decode, fit, resample, and re-encode one image.
    pub fn transform(
        &self,
        input: &[u8],
        declared_type: Option<&str>,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let img = decode_image(input, declared_type)?;

        let (src_w, src_h) = (img.width(), img.height());
        if src_w as u64 * src_h as u64 > MAX_SOURCE_PIXELS {
            return Err(EngineError::ResolutionTooLarge {
                width: src_w,
                height: src_h,
            });
        }

        let (dst_w, dst_h) = target_dimensions(src_w, src_h, options);
        let img = if (dst_w, dst_h) != (src_w, src_h) {
            resize_image(&img, dst_w, dst_h)?
        } else {
            img
        };

        encode_image(&img, options.format, options.quality)
    }

    pub fn is_available(&self) -> bool {
        // All codecs are statically linked
        true
    }
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode raster input via the image crate; SVG is rasterized at its
/// intrinsic size first. The declared media type picks the SVG path,
/// with a content sniff as fallback for raw-body uploads.
fn decode_image(input: &[u8], declared_type: Option<&str>) -> Result<DynamicImage, EngineError> {
    let is_svg = declared_type
        .map(|t| t.eq_ignore_ascii_case("image/svg+xml"))
        .unwrap_or(false)
        || looks_like_svg(input);
    if is_svg {
        return rasterize_svg(input);
    }

    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| EngineError::Decode(format!("failed to probe format: {e}")))?;
    reader
        .decode()
        .map_err(|e| EngineError::Decode(format!("decode failed: {e}")))
}

fn looks_like_svg(input: &[u8]) -> bool {
    input
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|&b| b == b'<')
        .unwrap_or(false)
}

fn rasterize_svg(data: &[u8]) -> Result<DynamicImage, EngineError> {
    let opt = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(data, &opt)
        .map_err(|e| EngineError::Decode(format!("SVG parse failed: {e}")))?;

    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| EngineError::Decode("SVG has no drawable area".to_string()))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha
    let mut rgba = Vec::with_capacity((size.width() * size.height() * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let img = RgbaImage::from_raw(size.width(), size.height(), rgba)
        .ok_or_else(|| EngineError::Decode("SVG rasterization produced no image".to_string()))?;
    Ok(DynamicImage::ImageRgba8(img))
}

fn target_dimensions(src_w: u32, src_h: u32, options: &EncodeOptions) -> (u32, u32) {
    match options.fit {
        ResizeFit::Inside => contain_dimensions(src_w, src_h, options.width, options.height),
        ResizeFit::Exact => exact_dimensions(src_w, src_h, options.width, options.height),
    }
}

/// Largest aspect-preserving fit inside the requested box. The 1.0 clamp
/// is the no-upscale invariant: output never exceeds source resolution.
fn contain_dimensions(
    src_w: u32,
    src_h: u32,
    target_w: Option<u32>,
    target_h: Option<u32>,
) -> (u32, u32) {
    let scale = match (target_w, target_h) {
        (None, None) => return (src_w, src_h),
        (Some(w), None) => (w as f64 / src_w as f64).min(1.0),
        (None, Some(h)) => (h as f64 / src_h as f64).min(1.0),
        (Some(w), Some(h)) => {
            let scale_w = w as f64 / src_w as f64;
            let scale_h = h as f64 / src_h as f64;
            scale_w.min(scale_h).min(1.0)
        }
    };

    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Stretch to the requested box, each axis clamped at the source size.
fn exact_dimensions(
    src_w: u32,
    src_h: u32,
    target_w: Option<u32>,
    target_h: Option<u32>,
) -> (u32, u32) {
    (
        target_w.unwrap_or(src_w).min(src_w).max(1),
        target_h.unwrap_or(src_h).min(src_h).max(1),
    )
}

/// Lanczos3 resample over RGBA8, so alpha survives into formats that
/// carry it. JPEG flattens to RGB at encode time.
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, EngineError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let src_image = Image::from_vec_u8(width, height, rgba.into_raw(), PixelType::U8x4)
        .map_err(|e| EngineError::Processing(format!("failed to create source image: {e}")))?;

    let mut dst_image = Image::new(target_w, target_h, PixelType::U8x4);

    let mut resizer = Resizer::new();
    resizer
        .resize(
            &src_image,
            &mut dst_image,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
        )
        .map_err(|e| EngineError::Processing(format!("resize failed: {e}")))?;

    let resized = RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| EngineError::Processing("failed to convert resized image".to_string()))?;

    Ok(DynamicImage::ImageRgba8(resized))
}

/// Encode with the fixed per-format policy: JPEG at the requested
/// quality, PNG at best compression with adaptive filtering, WebP
/// lossless at quality 100 and lossy below, AVIF at speed 4, GIF
/// palette-based by nature of the codec, TIFF at the encoder default.
fn encode_image(
    img: &DynamicImage,
    format: TargetFormat,
    quality: u8,
) -> Result<Vec<u8>, EngineError> {
    let mut buf = Cursor::new(Vec::new());

    match format {
        TargetFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| EngineError::Processing(format!("JPEG encode failed: {e}")))?;
        }
        TargetFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilterType::Adaptive);
            img.write_with_encoder(encoder)
                .map_err(|e| EngineError::Processing(format!("PNG encode failed: {e}")))?;
        }
        TargetFormat::WebP => {
            // libwebp owns the output buffer on this path
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba)
                .map_err(|e| EngineError::Processing(format!("WebP encode failed: {e}")))?;
            let memory = if quality >= 100 {
                encoder.encode_lossless()
            } else {
                encoder.encode(quality as f32)
            };
            return Ok(memory.to_vec());
        }
        TargetFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 4, quality);
            img.write_with_encoder(encoder)
                .map_err(|e| EngineError::Processing(format!("AVIF encode failed: {e}")))?;
        }
        TargetFormat::Tiff => {
            img.write_to(&mut buf, ImageFormat::Tiff)
                .map_err(|e| EngineError::Processing(format!("TIFF encode failed: {e}")))?;
        }
        TargetFormat::Gif => {
            img.write_to(&mut buf, ImageFormat::Gif)
                .map_err(|e| EngineError::Processing(format!("GIF encode failed: {e}")))?;
        }
    }

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(format: TargetFormat) -> EncodeOptions {
        EncodeOptions {
            format,
            quality: 80,
            width: None,
            height: None,
            fit: ResizeFit::Inside,
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_contain_dimensions() {
        // landscape into a square box, height-bound
        assert_eq!(contain_dimensions(1000, 500, Some(400), Some(400)), (400, 200));
        // portrait into a square box, width-bound
        assert_eq!(contain_dimensions(500, 1000, Some(400), Some(400)), (200, 400));
        // single axis scales proportionally
        assert_eq!(contain_dimensions(1920, 1080, Some(800), None), (800, 450));
        assert_eq!(contain_dimensions(1920, 1080, None, Some(600)), (1067, 600));
        // nothing requested
        assert_eq!(contain_dimensions(1920, 1080, None, None), (1920, 1080));
    }

    #[test]
    fn test_contain_never_upscales() {
        assert_eq!(contain_dimensions(100, 100, Some(200), Some(200)), (100, 100));
        assert_eq!(contain_dimensions(100, 50, Some(200), None), (100, 50));
        assert_eq!(contain_dimensions(2000, 1000, Some(5000), None), (2000, 1000));
    }

    #[test]
    fn test_contain_floors_at_one_pixel() {
        assert_eq!(contain_dimensions(10, 1000, Some(1), Some(1)), (1, 1));
        assert_eq!(contain_dimensions(10, 10, Some(1), None), (1, 1));
    }

    #[test]
    fn test_exact_dimensions_clamped_to_source() {
        assert_eq!(exact_dimensions(1000, 500, Some(300), Some(300)), (300, 300));
        assert_eq!(exact_dimensions(1000, 500, Some(3000), Some(700)), (1000, 500));
        assert_eq!(exact_dimensions(1000, 500, None, Some(200)), (1000, 200));
    }

    #[test]
    fn test_encode_jpeg_magic() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_image(&img, TargetFormat::Jpeg, 80).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_png_magic() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_image(&img, TargetFormat::Png, 80).unwrap();
        assert_eq!(&data[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_encode_webp_riff_container() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_image(&img, TargetFormat::WebP, 80).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        let lossless = encode_image(&img, TargetFormat::WebP, 100).unwrap();
        assert_eq!(&lossless[0..4], b"RIFF");
    }

    #[test]
    fn test_encode_gif_magic() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_image(&img, TargetFormat::Gif, 80).unwrap();
        assert_eq!(&data[0..3], b"GIF");
    }

    #[test]
    fn test_transform_resizes_within_box() {
        let engine = ImageEngine::new();
        let input = png_bytes(1000, 500);
        let mut opts = options(TargetFormat::Png);
        opts.width = Some(400);
        opts.height = Some(400);

        let out = engine.transform(&input, Some("image/png"), &opts).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 200));
    }

    #[test]
    fn test_transform_never_upscales() {
        let engine = ImageEngine::new();
        let input = png_bytes(200, 100);
        let mut opts = options(TargetFormat::Jpeg);
        opts.width = Some(5000);

        let out = engine.transform(&input, Some("image/png"), &opts).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn test_transform_rejects_garbage() {
        let engine = ImageEngine::new();
        let result = engine.transform(b"not an image at all", None, &options(TargetFormat::Png));
        assert!(matches!(result, Err(EngineError::Decode(_))));
    }

    #[test]
    fn test_transform_rasterizes_svg() {
        let engine = ImageEngine::new();
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="red"/></svg>"#;

        let out = engine
            .transform(svg, Some("image/svg+xml"), &options(TargetFormat::Png))
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }
}
