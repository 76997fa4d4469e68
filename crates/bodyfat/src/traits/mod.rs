use image::GrayImage;
use crate::{error::Result, types::{RasterImage, Silhouette}};

/// Trait for luminance preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Preprocess the luminance image (e.g., blur, denoise)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for background separation
pub trait ForegroundSegmenter: Send + Sync {
    /// Produce a binary image where 255 marks foreground
    fn segment(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for binary mask clean-up steps
pub trait MaskPostProcessor: Send + Sync {
    fn process(&self, mask: &GrayImage) -> Result<GrayImage>;
}

/// Trait for choosing the subject among foreground regions
pub trait RegionSelector: Send + Sync {
    fn select(&self, mask: &GrayImage) -> Result<Silhouette>;
}

/// Main trait for silhouette extraction
pub trait SilhouetteExtractor: Send + Sync {
    fn extract_silhouette(&self, raster: &RasterImage) -> Result<Silhouette>;
}
