use image::GrayImage;
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};
use crate::{
    error::Result,
    traits::{ForegroundSegmenter, MaskPostProcessor},
};

/// Global threshold chosen per image with Otsu's method
#[derive(Debug, Clone, Default)]
pub struct OtsuSegmenter;

impl ForegroundSegmenter for OtsuSegmenter {
    fn segment(&self, image: &GrayImage) -> Result<GrayImage> {
        let level = imageproc::contrast::otsu_level(image);
        tracing::trace!(level, "otsu threshold");
        Ok(normalize_polarity(imageproc::contrast::threshold(image, level)))
    }
}

/// Fixed global threshold
#[derive(Debug, Clone)]
pub struct FixedThresholdSegmenter {
    pub threshold: u8,
}

impl Default for FixedThresholdSegmenter {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ForegroundSegmenter for FixedThresholdSegmenter {
    fn segment(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(normalize_polarity(imageproc::contrast::threshold(image, self.threshold)))
    }
}

/// Invert a thresholded image when most of its border is foreground.
///
/// The subject may be darker or lighter than the backdrop; the frame border is
/// assumed to be mostly background either way.
pub fn normalize_polarity(mut binary: GrayImage) -> GrayImage {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return binary;
    }

    let mut border = 0u64;
    let mut foreground = 0u64;
    for (x, y, pixel) in binary.enumerate_pixels() {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            border += 1;
            if pixel[0] > 0 {
                foreground += 1;
            }
        }
    }

    if foreground * 2 > border {
        image::imageops::invert(&mut binary);
    }
    binary
}

/// Morphological opening; removes specks thinner than `2 * radius + 1`
#[derive(Debug, Clone)]
pub struct MorphologicalOpen {
    pub radius: u8,
}

impl MaskPostProcessor for MorphologicalOpen {
    fn process(&self, mask: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::morphology::open(mask, Norm::LInf, self.radius))
    }
}

/// Morphological closing; bridges gaps narrower than `2 * radius + 1`
#[derive(Debug, Clone)]
pub struct MorphologicalClose {
    pub radius: u8,
}

impl MaskPostProcessor for MorphologicalClose {
    fn process(&self, mask: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::morphology::close(mask, Norm::LInf, self.radius))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentationMethod {
    Otsu,
    Fixed { threshold: u8 },
}

/// Silhouette extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Gaussian blur sigma; 0 disables blurring
    pub blur_sigma: f32,
    /// Frames whose luminance range is below this are treated as blank
    pub min_contrast: u8,
    pub method: SegmentationMethod,
    /// Radius of the open/close clean-up; 0 disables it
    pub morphology_radius: u8,
    /// Minimum subject area as a fraction of the frame
    pub min_area_fraction: f64,
    /// A second region at least this fraction of the largest makes the scene ambiguous
    pub ambiguity_ratio: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            min_contrast: 24,
            method: SegmentationMethod::Otsu,
            morphology_radius: 2,
            min_area_fraction: 0.02,
            ambiguity_ratio: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_image(subject: u8, background: u8) -> GrayImage {
        let mut image = GrayImage::from_pixel(40, 40, Luma([background]));
        for y in 10..30 {
            for x in 10..30 {
                image.put_pixel(x, y, Luma([subject]));
            }
        }
        image
    }

    #[test]
    fn test_dark_and_light_subjects_give_same_mask() {
        let dark = OtsuSegmenter.segment(&square_image(30, 220)).unwrap();
        let light = OtsuSegmenter.segment(&square_image(220, 30)).unwrap();
        assert_eq!(dark, light);
        assert_eq!(dark.get_pixel(20, 20)[0], 255);
        assert_eq!(dark.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_fixed_threshold() {
        let mask = FixedThresholdSegmenter { threshold: 100 }
            .segment(&square_image(150, 50))
            .unwrap();
        assert_eq!(mask.get_pixel(15, 15)[0], 255);
        assert_eq!(mask.get_pixel(35, 35)[0], 0);
    }

    #[test]
    fn test_opening_removes_specks() {
        let mut mask = square_image(255, 0);
        mask.put_pixel(2, 2, Luma([255u8]));
        let opened = MorphologicalOpen { radius: 2 }.process(&mask).unwrap();
        assert_eq!(opened.get_pixel(2, 2)[0], 0);
        assert_eq!(opened.get_pixel(20, 20)[0], 255);
    }

    #[test]
    fn test_method_from_toml() {
        let config: SegmentationConfig = toml::from_str(
            "blur_sigma = 0.0\n[method]\ntype = \"fixed\"\nthreshold = 90\n",
        )
        .unwrap();
        assert_eq!(config.method, SegmentationMethod::Fixed { threshold: 90 });
        assert_eq!(config.min_area_fraction, 0.02);
    }
}
