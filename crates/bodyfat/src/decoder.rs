use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageDecoder as _, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{EstimationError, Result},
    types::RasterImage,
};

/// Formats accepted from clients, keyed by MIME type
const ACCEPTED_MIME_TYPES: &[(&str, ImageFormat)] = &[
    ("image/jpeg", ImageFormat::Jpeg),
    ("image/jpg", ImageFormat::Jpeg),
    ("image/png", ImageFormat::Png),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest accepted payload in bytes
    pub max_bytes: usize,
    /// Largest accepted width × height before decoding
    pub max_pixels: u64,
    /// Longest side after downscaling
    pub max_dimension: u32,
    /// Shortest accepted side after downscaling
    pub min_dimension: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_pixels: 50_000_000,
            max_dimension: 1024,
            min_dimension: 64,
        }
    }
}

/// Image format for a declared MIME type, if it is one we accept
pub fn format_for_mime(mime_type: &str) -> Option<ImageFormat> {
    let mime_type = mime_type.trim();
    ACCEPTED_MIME_TYPES
        .iter()
        .find(|(accepted, _)| accepted.eq_ignore_ascii_case(mime_type))
        .map(|(_, format)| *format)
}

/// MIME type inferred from a file extension
pub fn mime_for_path(path: &std::path::Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Turns raw upload bytes into a bounded, upright RGB raster
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder {
    config: DecoderConfig,
}

impl ImageDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, bytes: &[u8], mime_type: &str) -> Result<RasterImage> {
        if bytes.is_empty() {
            return Err(EstimationError::Decode("image payload is empty".to_string()));
        }
        if bytes.len() > self.config.max_bytes {
            return Err(EstimationError::Decode(format!(
                "image payload is {} bytes, limit is {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let format = format_for_mime(mime_type).ok_or_else(|| {
            EstimationError::Decode(format!(
                "unsupported MIME type '{mime_type}', expected image/jpeg or image/png"
            ))
        })?;

        let sniffed = image::guess_format(bytes)?;
        if sniffed != format {
            return Err(EstimationError::Decode(format!(
                "declared {mime_type} but payload looks like {sniffed:?}"
            )));
        }

        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format).into_dimensions()?;
        let pixel_count = (width as u64).saturating_mul(height as u64);
        if width == 0 || height == 0 || pixel_count > self.config.max_pixels {
            return Err(EstimationError::Decode(format!(
                "image dimensions {width}x{height} are outside the accepted range"
            )));
        }

        let mut decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        let image = self.downscale(image);
        if image.width() < self.config.min_dimension || image.height() < self.config.min_dimension {
            return Err(EstimationError::Decode(format!(
                "image is {}x{}, minimum side is {} px",
                image.width(),
                image.height(),
                self.config.min_dimension
            )));
        }

        debug!(
            original_width = width,
            original_height = height,
            width = image.width(),
            height = image.height(),
            "image decoded"
        );
        Ok(RasterImage::new(image.to_rgb8()))
    }

    fn downscale(&self, image: DynamicImage) -> DynamicImage {
        let max = self.config.max_dimension;
        if image.width() <= max && image.height() <= max {
            return image;
        }
        // `resize` keeps the aspect ratio and fits within the bounds
        image.resize(max, max, FilterType::Triangle)
    }
}
