use std::sync::Arc;

use base64::Engine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::{
    algorithms::MeasurementEstimator,
    analysis::BodyAnalyzer,
    classifier::Classifier,
    config::EstimatorConfig,
    decoder::ImageDecoder,
    error::{ConfigError, EstimationError, Result},
    formula::{BodyFatFormula, FormulaVariant},
    pipeline::{builder::PipelineBuilder, SilhouettePipeline},
    profile::{Sex, SubjectProfile},
    traits::SilhouetteExtractor,
    types::{EstimationResult, RasterImage, Silhouette, DISCLAIMER},
};

/// One client request: subject attributes plus the photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EstimationRequest {
    #[schemars(description = "Biological sex: male/female (also accepts masculino/feminino, m/f)")]
    pub sex: String,
    #[schemars(description = "Age in whole years")]
    pub age: i64,
    #[serde(alias = "altura")]
    #[schemars(description = "Height in centimeters")]
    pub height_cm: f64,
    #[serde(alias = "peso")]
    #[schemars(description = "Weight in kilograms")]
    pub weight_kg: f64,
    #[schemars(description = "Full-body photo, base64 encoded (a data URL prefix is accepted)")]
    pub image_base64: String,
    #[schemars(description = "MIME type of the photo: image/jpeg or image/png")]
    pub mime_type: String,
}

impl EstimationRequest {
    /// Generate JSON schema for the request
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EstimationRequest)
    }

    fn image_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.image_base64.trim();
        let payload = match payload.strip_prefix("data:") {
            Some(data_url) => data_url.split_once(',').map_or(data_url, |(_, data)| data),
            None => payload,
        };
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| EstimationError::Decode(format!("image_base64 is not valid base64: {e}")))
    }
}

/// Runs the whole estimation for one subject and photo.
///
/// Holds only read-only state, so a single instance can serve concurrent
/// requests from several threads.
pub struct Estimator {
    config: Arc<EstimatorConfig>,
    decoder: ImageDecoder,
    pipeline: SilhouettePipeline,
    measurer: MeasurementEstimator,
    formula: BodyFatFormula,
    classifier: Classifier,
    analyzer: BodyAnalyzer,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let pipeline = PipelineBuilder::from_config(&config.segmentation).build();
        debug!(pipeline = %pipeline.info(), "estimator ready");

        Ok(Self {
            decoder: ImageDecoder::new(config.decoder.clone()),
            measurer: MeasurementEstimator::new(config.measurement.clone()),
            formula: BodyFatFormula::new(config.formula.clone()),
            classifier: Classifier::new(config.classification.clone()),
            analyzer: BodyAnalyzer::new(config.analysis.clone()),
            pipeline,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Arc<EstimatorConfig> {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Validate the subject attributes of a request
    pub fn profile_from_request(&self, request: &EstimationRequest) -> Result<SubjectProfile> {
        SubjectProfile::new(
            Sex::parse(&request.sex)?,
            request.age,
            request.height_cm,
            request.weight_kg,
            &self.config.profile,
        )
    }

    pub fn estimate(&self, request: &EstimationRequest) -> Result<EstimationResult> {
        let span = info_span!("estimate", sex = %request.sex, age = request.age, mime_type = %request.mime_type);
        let _guard = span.enter();

        self.profile_from_request(request)
            .and_then(|profile| {
                let bytes = request.image_bytes()?;
                self.decode_and_estimate(&profile, &bytes, &request.mime_type)
            })
            .inspect_err(log_rejection)
    }

    pub fn estimate_bytes(
        &self,
        profile: &SubjectProfile,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<EstimationResult> {
        let span = info_span!("estimate", sex = %profile.sex(), age = profile.age(), mime_type);
        let _guard = span.enter();

        self.decode_and_estimate(profile, bytes, mime_type)
            .inspect_err(log_rejection)
    }

    fn decode_and_estimate(
        &self,
        profile: &SubjectProfile,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<EstimationResult> {
        debug!(bytes = bytes.len(), "decoding upload");
        let raster = self.decoder.decode(bytes, mime_type)?;
        self.estimate_raster(profile, &raster)
    }

    pub fn estimate_raster(&self, profile: &SubjectProfile, raster: &RasterImage) -> Result<EstimationResult> {
        let silhouette = self.pipeline.extract_silhouette(raster)?;
        self.estimate_silhouette(profile, &silhouette)
    }

    /// Measurement, formula and classification on an already extracted silhouette
    pub fn estimate_silhouette(&self, profile: &SubjectProfile, silhouette: &Silhouette) -> Result<EstimationResult> {
        let variant = FormulaVariant::for_sex(profile.sex());
        let report = self.measurer.estimate(silhouette, profile.height_cm(), variant)?;
        let output = self.formula.compute(profile, &report.measurements)?;

        let bounds = &self.config.formula;
        let body_fat_percentage = round1(output.percentage).clamp(bounds.min_percentage, bounds.max_percentage);
        let classification = self.classifier.classify(body_fat_percentage, profile.sex(), profile.age());

        let fat_mass_kg = profile.weight_kg() * body_fat_percentage / 100.0;
        let lean_mass_kg = profile.weight_kg() - fat_mass_kg;
        let bmi = round1(profile.bmi());

        let mut analysis = self.analyzer.analyze(profile.sex(), body_fat_percentage, bmi, report.ratios.as_ref());
        if output.clamped {
            analysis.alerts.push(format!(
                "The raw estimate fell outside {}-{}% and was limited to the nearest bound.",
                bounds.min_percentage, bounds.max_percentage
            ));
        }

        info!(
            body_fat_percentage,
            %classification,
            clamped = output.clamped,
            alerts = analysis.alerts.len(),
            "estimation complete"
        );

        Ok(EstimationResult {
            body_fat_percentage,
            classification,
            classification_description: classification.description().to_string(),
            message: DISCLAIMER.to_string(),
            bmi,
            fat_mass_kg: round1(fat_mass_kg),
            lean_mass_kg: round1(lean_mass_kg),
            measurements: report.measurements,
            clamped: output.clamped,
            ratios: report.ratios,
            body_type: analysis.body_type,
            body_shape: analysis.body_shape,
            health_status: analysis.health_status,
            alerts: analysis.alerts,
        })
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            config: Arc::new(EstimatorConfig::default()),
            decoder: ImageDecoder::default(),
            pipeline: SilhouettePipeline::default(),
            measurer: MeasurementEstimator::default(),
            formula: BodyFatFormula::default(),
            classifier: Classifier::default(),
            analyzer: BodyAnalyzer::default(),
        }
    }
}

fn log_rejection(err: &EstimationError) {
    warn!(kind = %err.kind(), status = err.status_code(), "estimation rejected: {err}");
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{BodyShape, BodyType},
        classifier::Classification,
        types::AnatomicalBand,
    };
    use image::{GrayImage, Luma};
    use std::sync::Mutex;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::{layer::Context, prelude::*, registry::LookupSpan, Layer};

    /// Records the names of the spans enclosing every event
    #[derive(Clone, Default)]
    struct EventScopes(Arc<Mutex<Vec<Vec<&'static str>>>>);

    impl<S> Layer<S> for EventScopes
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let names = ctx
                .event_scope(event)
                .map(|scope| scope.map(|span| span.name()).collect())
                .unwrap_or_default();
            self.0.lock().unwrap().push(names);
        }
    }

    fn request(sex: &str, age: i64, image_base64: &str) -> EstimationRequest {
        EstimationRequest {
            sex: sex.to_string(),
            age,
            height_cm: 180.0,
            weight_kg: 80.0,
            image_base64: image_base64.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    fn figure(waist_width: u32) -> Silhouette {
        let mut mask = GrayImage::new(200, 400);
        for (width, y0, y1) in [(40, 20, 60), (26, 60, 80), (80, 80, 150), (waist_width, 150, 185), (70, 185, 230), (50, 230, 380)] {
            for y in y0..y1 {
                for x in (100 - width / 2)..(100 + width / 2) {
                    mask.put_pixel(x, y, Luma([255u8]));
                }
            }
        }
        Silhouette::from_mask(mask).unwrap()
    }

    #[test]
    fn test_request_accepts_portuguese_aliases() {
        let request: EstimationRequest = serde_json::from_str(
            r#"{"sex":"masculino","age":30,"altura":175,"peso":78,"image_base64":"","mime_type":"image/png"}"#,
        )
        .unwrap();
        assert_eq!(request.height_cm, 175.0);
        assert_eq!(request.weight_kg, 78.0);
        let profile = Estimator::default().profile_from_request(&request).unwrap();
        assert_eq!(profile.sex(), Sex::Male);
    }

    #[test]
    fn test_validation_runs_before_decoding() {
        let estimator = Estimator::default();
        let err = estimator.estimate(&request("other", 30, "%%%")).unwrap_err();
        assert!(matches!(err, EstimationError::Validation { field: "sex", .. }));

        let err = estimator.estimate(&request("male", 0, "%%%")).unwrap_err();
        assert!(matches!(err, EstimationError::Validation { field: "age", .. }));

        let err = estimator.estimate(&request("male", 30, "%%%")).unwrap_err();
        assert!(matches!(err, EstimationError::Decode(_)));
    }

    #[test]
    fn test_rejections_are_logged_inside_request_span() {
        let scopes = EventScopes::default();
        let subscriber = tracing_subscriber::registry().with(scopes.clone());
        let estimator = Estimator::default();

        tracing::subscriber::with_default(subscriber, || {
            assert!(estimator.estimate(&request("other", 30, "%%%")).is_err());
            assert!(estimator.estimate(&request("male", 30, "%%%")).is_err());
        });

        let events = scopes.0.lock().unwrap();
        assert!(events.len() >= 2);
        assert!(events.iter().all(|names| names.contains(&"estimate")), "{events:?}");
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"abc");
        let request = request("f", 30, &format!("data:image/png;base64,{encoded}"));
        assert_eq!(request.image_bytes().unwrap(), b"abc");
    }

    #[test]
    fn test_estimate_from_silhouette() {
        let estimator = Estimator::default();
        let profile = SubjectProfile::new(Sex::Male, 30, 180.0, 80.0, &estimator.config().profile).unwrap();
        let result = estimator.estimate_silhouette(&profile, &figure(60)).unwrap();

        assert!((2.0..=60.0).contains(&result.body_fat_percentage));
        assert_eq!(result.body_fat_percentage, round1(result.body_fat_percentage));
        assert_eq!(
            result.classification,
            estimator.classifier().classify(result.body_fat_percentage, Sex::Male, 30)
        );
        assert_eq!(result.message, DISCLAIMER);
        assert!((result.fat_mass_kg + result.lean_mass_kg - 80.0).abs() < 0.11);
        assert_eq!(result.bmi, 24.7);
        assert!(result.measurements.hip_cm.is_none());

        let ratios = result.ratios.expect("shoulder band is measurable");
        assert_eq!(ratios.waist_to_shoulder, 0.75);
        assert_eq!(result.body_shape, Some(BodyShape::Round));
        assert_eq!(result.body_type, Some(BodyType::Overweight));
        assert_eq!(
            result.health_status,
            estimator.analyzer.health_status(Sex::Male, result.body_fat_percentage, result.bmi)
        );
    }

    #[test]
    fn test_alerts_do_not_change_estimate() {
        let lenient = Estimator::default();
        let mut config = EstimatorConfig::default();
        config.analysis.alerts.wide_waist_to_shoulder = 0.1;
        config.analysis.alerts.wide_waist_min_percentage = 60.0;
        let strict = Estimator::new(config).unwrap();

        let profile = SubjectProfile::new(Sex::Male, 30, 180.0, 80.0, &lenient.config().profile).unwrap();
        let base = lenient.estimate_silhouette(&profile, &figure(60)).unwrap();
        let flagged = strict.estimate_silhouette(&profile, &figure(60)).unwrap();

        assert!(flagged.alerts.iter().any(|alert| alert.contains("waist is wide")));
        assert_eq!(flagged.body_fat_percentage, base.body_fat_percentage);
        assert_eq!(flagged.classification, base.classification);
    }

    #[test]
    fn test_female_estimate_includes_hip() {
        let estimator = Estimator::default();
        let profile = SubjectProfile::new(Sex::Female, 45, 180.0, 70.0, &estimator.config().profile).unwrap();
        let result = estimator.estimate_silhouette(&profile, &figure(60)).unwrap();
        assert!(result.measurements.hip_cm.is_some());
        assert!(result.classification >= Classification::Essential);
    }

    #[test]
    fn test_measurement_failure_short_circuits() {
        let estimator = Estimator::default();
        let profile = SubjectProfile::new(Sex::Male, 30, 180.0, 80.0, &estimator.config().profile).unwrap();
        let err = estimator.estimate_silhouette(&profile, &figure(10)).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::MeasurementOutOfRange { band: AnatomicalBand::Waist, .. }
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EstimatorConfig::default();
        config.formula.min_percentage = 80.0;
        assert!(Estimator::new(config).is_err());
    }
}
