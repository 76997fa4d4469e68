//! # Body Fat Estimation Library
//!
//! Estimates body-fat percentage from a single full-body photo plus the
//! subject's sex, age, height and weight, and maps it to a fitness band.
//!
//! ## Stages
//!
//! - **Decoding**: bounded, upright RGB raster from JPEG/PNG bytes
//! - **Silhouette extraction**: trait-based pipeline (blur, threshold,
//!   morphology, region selection) composed with a builder
//! - **Measurement**: neck/waist/hip circumferences from calibrated band scans,
//!   shoulder-relative width ratios
//! - **Formula**: U.S. Navy circumference method, clamped
//! - **Classification**: sex and age-band threshold tables
//! - **Analysis**: body ratios, build, shape and health status, plus
//!   advisory alerts that never alter the estimate
//!
//! Results are educational estimates, not clinical assessments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bodyfat::{Estimator, EstimatorConfig, ProfileLimits, Sex, SubjectProfile};
//!
//! let estimator = Estimator::new(EstimatorConfig::default())?;
//! let profile = SubjectProfile::new(Sex::Female, 34, 165.0, 61.0, &ProfileLimits::default())?;
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! let result = estimator.estimate_bytes(&profile, &bytes, "image/jpeg")?;
//! println!("{}% ({})", result.body_fat_percentage, result.classification);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use bodyfat::{SilhouettePipeline, algorithms::*};
//!
//! let pipeline = SilhouettePipeline::builder()
//!     .add_preprocessor(MedianFilterPreprocessor { radius: 2 })
//!     .with_min_contrast(16)
//!     .set_segmenter(FixedThresholdSegmenter { threshold: 110 })
//!     .with_morphology(3)
//!     .build();
//!
//! let image = image::open("photo.png")?.to_luma8();
//! let silhouette = pipeline.process(&image)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod profile;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod decoder;
pub mod formula;
pub mod classifier;
pub mod analysis;
pub mod config;
pub mod estimator;
pub mod mcp;

// Re-exports for convenience
pub use error::{ConfigError, ErrorKind, ErrorResponse, EstimationError, Result};
pub use types::*;
pub use profile::{ProfileLimits, Sex, SubjectProfile};
pub use traits::*;
pub use pipeline::{SilhouettePipeline, builder::PipelineBuilder};
pub use decoder::{DecoderConfig, ImageDecoder};
pub use formula::{BodyFatFormula, FormulaConfig, FormulaOutput, FormulaVariant};
pub use classifier::{Classification, ClassificationConfig, Classifier};
pub use analysis::{AnalysisConfig, BodyAnalysis, BodyAnalyzer, BodyShape, BodyType, HealthStatus};
pub use config::EstimatorConfig;
pub use estimator::{EstimationRequest, Estimator};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_estimator_is_shareable() {
        assert_send_sync::<Estimator>();
        assert_send_sync::<SilhouettePipeline>();
    }

    #[test]
    fn test_scenario_formula_and_band() {
        // 175 cm male, neck 38 cm, waist 85 cm
        let profile = SubjectProfile::new(Sex::Male, 22, 175.0, 78.0, &ProfileLimits::default()).unwrap();
        let measurements = DerivedMeasurements { neck_cm: 38.0, waist_cm: 85.0, hip_cm: None };

        let output = BodyFatFormula::default().compute(&profile, &measurements).unwrap();
        assert!((output.percentage - 16.94).abs() < 0.05, "got {}", output.percentage);
        assert_eq!(
            Classifier::default().classify(output.percentage, Sex::Male, 22),
            Classification::Fitness
        );
    }
}
