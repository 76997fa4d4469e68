pub mod builder;

use image::GrayImage;
use tracing::debug;

use crate::{
    algorithms::luminance_range,
    error::{EstimationError, Result},
    traits::{ForegroundSegmenter, ImagePreprocessor, MaskPostProcessor, RegionSelector, SilhouetteExtractor},
    types::{RasterImage, Silhouette},
};

/// Silhouette extraction in stages: preprocess, contrast guard, segment,
/// clean up the mask, then pick the subject region.
pub struct SilhouettePipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    min_contrast: u8,
    segmenter: Box<dyn ForegroundSegmenter>,
    postprocessors: Vec<Box<dyn MaskPostProcessor>>,
    selector: Box<dyn RegionSelector>,
}

impl SilhouettePipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        min_contrast: u8,
        segmenter: Box<dyn ForegroundSegmenter>,
        postprocessors: Vec<Box<dyn MaskPostProcessor>>,
        selector: Box<dyn RegionSelector>,
    ) -> Self {
        Self {
            preprocessors,
            min_contrast,
            segmenter,
            postprocessors,
            selector,
        }
    }

    /// Run a luminance image through every stage
    pub fn process(&self, image: &GrayImage) -> Result<Silhouette> {
        let mut processed = image.clone();
        for preprocessor in &self.preprocessors {
            processed = preprocessor.preprocess(&processed)?;
        }

        // Uniform frames would still yield an Otsu split on noise
        let range = luminance_range(&processed);
        if range < self.min_contrast {
            return Err(EstimationError::NoSubjectDetected(format!(
                "image has too little contrast (luminance range {range}, need {})",
                self.min_contrast
            )));
        }

        let mut mask = self.segmenter.segment(&processed)?;
        for postprocessor in &self.postprocessors {
            mask = postprocessor.process(&mask)?;
        }

        let silhouette = self.selector.select(&mask)?;
        debug!(
            top = silhouette.extent.top,
            bottom = silhouette.extent.bottom,
            area_px = silhouette.area_px,
            "silhouette extracted"
        );
        Ok(silhouette)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} preprocessors, contrast >= {}, 1 segmenter, {} postprocessors, 1 region selector",
            self.preprocessors.len(),
            self.min_contrast,
            self.postprocessors.len()
        )
    }
}

impl SilhouetteExtractor for SilhouettePipeline {
    fn extract_silhouette(&self, raster: &RasterImage) -> Result<Silhouette> {
        self.process(&raster.to_luma())
    }
}

impl Default for SilhouettePipeline {
    fn default() -> Self {
        builder::PipelineBuilder::from_config(&Default::default()).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{FixedThresholdSegmenter, SegmentationConfig};
    use image::{Luma, Rgb, RgbImage};

    fn figure_image(subject: u8, background: u8) -> GrayImage {
        let mut image = GrayImage::from_pixel(120, 200, Luma([background]));
        for y in 20..180 {
            for x in 45..75 {
                image.put_pixel(x, y, Luma([subject]));
            }
        }
        image
    }

    #[test]
    fn test_default_pipeline_finds_subject() {
        let silhouette = SilhouettePipeline::default()
            .process(&figure_image(40, 230))
            .expect("subject on plain background");
        assert!((silhouette.extent.top as i32 - 20).abs() <= 1);
        assert!((silhouette.extent.bottom as i32 - 179).abs() <= 1);
        assert!(silhouette.is_foreground(60, 100));
        assert!(!silhouette.is_foreground(5, 5));
    }

    #[test]
    fn test_blank_image_is_rejected() {
        let blank = GrayImage::from_pixel(120, 200, Luma([128u8]));
        let err = SilhouettePipeline::default().process(&blank).unwrap_err();
        assert!(matches!(err, EstimationError::NoSubjectDetected(_)));
    }

    #[test]
    fn test_light_subject_on_dark_background() {
        let pipeline = SilhouettePipeline::default();
        let dark = pipeline.process(&figure_image(40, 230)).unwrap();
        let light = pipeline.process(&figure_image(230, 40)).unwrap();
        assert!((dark.extent.top as i32 - light.extent.top as i32).abs() <= 1);
        let ratio = dark.area_px as f64 / light.area_px as f64;
        assert!((ratio - 1.0).abs() < 0.1, "area ratio was {ratio}");
    }

    #[test]
    fn test_extracts_from_rgb_raster() {
        let raster = RasterImage::new(RgbImage::from_fn(120, 200, |x, y| {
            if (45..75).contains(&x) && (20..180).contains(&y) {
                Rgb([30, 40, 50])
            } else {
                Rgb([240, 240, 235])
            }
        }));
        let silhouette = SilhouettePipeline::default().extract_silhouette(&raster).unwrap();
        assert!(silhouette.area_px > 0);
    }

    #[test]
    fn test_custom_pipeline() {
        let pipeline = SilhouettePipeline::builder()
            .set_segmenter(FixedThresholdSegmenter { threshold: 100 })
            .build();
        assert!(pipeline.info().contains("0 preprocessors"));
        assert!(pipeline.process(&figure_image(40, 230)).is_ok());

        let configured = builder::PipelineBuilder::from_config(&SegmentationConfig {
            blur_sigma: 0.0,
            morphology_radius: 0,
            ..SegmentationConfig::default()
        })
        .build();
        assert!(configured.info().contains("0 preprocessors"));
        assert!(configured.info().contains("0 postprocessors"));
    }
}
