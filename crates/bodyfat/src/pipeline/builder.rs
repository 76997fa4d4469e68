use crate::{
    pipeline::SilhouettePipeline,
    traits::{ForegroundSegmenter, ImagePreprocessor, MaskPostProcessor, RegionSelector},
    algorithms::{
        FixedThresholdSegmenter,
        GaussianBlurPreprocessor,
        LargestComponentSelector,
        MorphologicalClose,
        MorphologicalOpen,
        OtsuSegmenter,
        SegmentationConfig,
        SegmentationMethod,
    },
};

/// Builder for creating silhouette pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    min_contrast: u8,
    segmenter: Option<Box<dyn ForegroundSegmenter>>,
    postprocessors: Vec<Box<dyn MaskPostProcessor>>,
    selector: Option<Box<dyn RegionSelector>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            min_contrast: 0,
            segmenter: None,
            postprocessors: Vec::new(),
            selector: None,
        }
    }

    /// Assemble the stages described by a segmentation config
    pub fn from_config(config: &SegmentationConfig) -> Self {
        let mut builder = Self::new()
            .with_blur(config.blur_sigma)
            .with_min_contrast(config.min_contrast)
            .with_morphology(config.morphology_radius)
            .set_region_selector(LargestComponentSelector {
                min_area_fraction: config.min_area_fraction,
                ambiguity_ratio: config.ambiguity_ratio,
            });

        builder = match config.method {
            SegmentationMethod::Otsu => builder.set_segmenter(OtsuSegmenter),
            SegmentationMethod::Fixed { threshold } => {
                builder.set_segmenter(FixedThresholdSegmenter { threshold })
            }
        };
        builder
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Add a Gaussian blur; a non-positive sigma adds nothing
    pub fn with_blur(self, sigma: f32) -> Self {
        if sigma > 0.0 {
            self.add_preprocessor(GaussianBlurPreprocessor { sigma })
        } else {
            self
        }
    }

    /// Reject frames whose luminance range is below `min_contrast`
    pub fn with_min_contrast(mut self, min_contrast: u8) -> Self {
        self.min_contrast = min_contrast;
        self
    }

    /// Set the foreground segmenter (replaces any existing one)
    pub fn set_segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: ForegroundSegmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// Add a post-processor to the pipeline
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: MaskPostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Open then close the mask; radius 0 adds nothing
    pub fn with_morphology(self, radius: u8) -> Self {
        if radius == 0 {
            return self;
        }
        self.add_postprocessor(MorphologicalOpen { radius })
            .add_postprocessor(MorphologicalClose { radius })
    }

    /// Set the region selector (replaces any existing one)
    pub fn set_region_selector<R>(mut self, selector: R) -> Self
    where
        R: RegionSelector + 'static,
    {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> SilhouettePipeline {
        let segmenter = self.segmenter
            .unwrap_or_else(|| Box::new(OtsuSegmenter));

        let selector = self.selector
            .unwrap_or_else(|| Box::new(LargestComponentSelector::default()));

        SilhouettePipeline::new(
            self.preprocessors,
            self.min_contrast,
            segmenter,
            self.postprocessors,
            selector,
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
