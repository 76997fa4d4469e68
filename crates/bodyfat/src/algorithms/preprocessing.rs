use image::GrayImage;
use crate::{error::Result, traits::ImagePreprocessor};

/// Gaussian blur preprocessor for noise reduction
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self { sigma: 1.5 }
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::filter::gaussian_blur_f32(image, self.sigma))
    }
}

/// Median filter preprocessor; removes salt-and-pepper noise while keeping edges
#[derive(Debug, Clone)]
pub struct MedianFilterPreprocessor {
    pub radius: u32,
}

impl Default for MedianFilterPreprocessor {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl ImagePreprocessor for MedianFilterPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::filter::median_filter(image, self.radius, self.radius))
    }
}

/// Difference between the brightest and darkest pixel
pub fn luminance_range(image: &GrayImage) -> u8 {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(min, max), p| (min.min(p[0]), max.max(p[0])));
    max.saturating_sub(min)
}
