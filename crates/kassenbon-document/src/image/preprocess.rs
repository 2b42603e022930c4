// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt image preprocessor — validation, downscaling, grayscale + contrast
// enhancement, and JPEG re-encoding. Every image goes through this before it
// reaches the recognition engine; there is no raw path.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use kassenbon_core::display::DisplayRegistry;
use kassenbon_core::error::{KassenbonError, Result};
use kassenbon_core::types::{NormalizedImage, RawImageInput};
use kassenbon_core::ScanConfig;
use tracing::{debug, info, instrument};

/// Luminance weights (ITU-R BT.601).
const LUMA_RED: f32 = 0.299;
const LUMA_GREEN: f32 = 0.587;
const LUMA_BLUE: f32 = 0.114;

/// Contrast is stretched around this value.
const CONTRAST_MIDPOINT: f32 = 128.0;

/// Turns a [`RawImageInput`] into a recognition-ready [`NormalizedImage`].
///
/// ```ignore
/// let preprocessor = ImagePreprocessor::new(&ScanConfig::default(), registry);
/// let normalized = preprocessor.preprocess(raw)?;
/// ```
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    max_input_bytes: usize,
    max_width: u32,
    contrast_gain: f32,
    jpeg_quality: u8,
    registry: DisplayRegistry,
}

impl ImagePreprocessor {
    pub fn new(config: &ScanConfig, registry: DisplayRegistry) -> Self {
        Self {
            max_input_bytes: config.max_input_bytes,
            max_width: config.max_width,
            contrast_gain: config.contrast_gain,
            jpeg_quality: config.jpeg_quality,
            registry,
        }
    }

    /// Registry the display handles are issued from.
    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    /// Reject inputs that are not images or are too large.
    pub fn validate(&self, raw: &RawImageInput) -> Result<()> {
        if !raw.is_image() {
            return Err(KassenbonError::InvalidInput(format!(
                "declared media type `{}` is not an image",
                raw.media_type()
            )));
        }
        if raw.byte_len() > self.max_input_bytes {
            return Err(KassenbonError::InvalidInput(format!(
                "{} bytes exceeds the {} byte limit",
                raw.byte_len(),
                self.max_input_bytes
            )));
        }
        Ok(())
    }

    /// Validate, decode, downscale, enhance and re-encode.
    #[instrument(skip_all, fields(media_type = raw.media_type(), byte_len = raw.byte_len()))]
    pub fn preprocess(&self, raw: RawImageInput) -> Result<NormalizedImage> {
        self.validate(&raw)?;

        let decoded = image::load_from_memory(raw.bytes()).map_err(|err| {
            KassenbonError::InvalidInput(format!("failed to decode image: {err}"))
        })?;
        drop(raw);
        info!(
            width = decoded.width(),
            height = decoded.height(),
            "Receipt image decoded"
        );

        let scaled = scale_to_width(decoded, self.max_width);
        let mut pixels = scaled.to_rgba8();
        drop(scaled);

        enhance_contrast(&mut pixels, self.contrast_gain);
        let (width, height) = pixels.dimensions();

        let bytes = encode_jpeg(&pixels, self.jpeg_quality)?;
        debug!(width, height, encoded_len = bytes.len(), "Receipt image normalized");

        Ok(NormalizedImage {
            bytes,
            width,
            height,
            display: self.registry.issue(),
        })
    }
}

/// Target dimensions: width capped at `max_width`, aspect ratio preserved.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled_height = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled_height as u32).max(1))
}

fn scale_to_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let (new_w, new_h) = scaled_dimensions(width, height, max_width);
    if (new_w, new_h) == (width, height) {
        return image;
    }
    debug!(from_w = width, from_h = height, new_w, new_h, "Downscaling receipt");
    image.resize_exact(new_w, new_h, FilterType::Lanczos3)
}

/// Enhanced gray level for one RGB pixel.
pub fn enhanced_level(r: u8, g: u8, b: u8, gain: f32) -> u8 {
    let luminance = LUMA_RED * f32::from(r) + LUMA_GREEN * f32::from(g) + LUMA_BLUE * f32::from(b);
    let adjusted = (luminance - CONTRAST_MIDPOINT) * gain + CONTRAST_MIDPOINT;
    adjusted.clamp(0.0, 255.0).round() as u8
}

/// Replace every pixel with its contrast-stretched luminance. Alpha is kept.
pub fn enhance_contrast(pixels: &mut RgbaImage, gain: f32) {
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let level = enhanced_level(r, g, b, gain);
        *pixel = Rgba([level, level, level, a]);
    }
}

fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let Rgba([r, g, b, _]) = *pixels.get_pixel(x, y);
        Rgb([r, g, b])
    });
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| KassenbonError::ImageError(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}
