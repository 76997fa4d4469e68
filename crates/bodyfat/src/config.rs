use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use strum::IntoEnumIterator;

use crate::{
    analysis::AnalysisConfig,
    algorithms::{MeasurementConfig, SegmentationConfig},
    classifier::ClassificationConfig,
    decoder::DecoderConfig,
    error::ConfigError,
    formula::{FormulaConfig, PERCENTAGE_CEILING, PERCENTAGE_FLOOR},
    profile::ProfileLimits,
    types::AnatomicalBand,
};

/// Everything tunable about an estimation, loaded once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EstimatorConfig {
    pub profile: ProfileLimits,
    pub decoder: DecoderConfig,
    pub segmentation: SegmentationConfig,
    pub measurement: MeasurementConfig,
    pub formula: FormulaConfig,
    pub classification: ClassificationConfig,
    pub analysis: AnalysisConfig,
}

impl EstimatorConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EstimatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EstimatorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    /// Convert the configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate JSON schema for the configuration
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EstimatorConfig)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let profile = &self.profile;
        if profile.min_age > profile.max_age
            || !(profile.min_height_cm > 0.0 && profile.min_height_cm < profile.max_height_cm)
            || !(profile.min_weight_kg > 0.0 && profile.min_weight_kg < profile.max_weight_kg)
        {
            return Err(ConfigError::Invalid("profile limits must be positive, ordered ranges".into()));
        }

        let decoder = &self.decoder;
        if decoder.max_bytes == 0 || decoder.max_pixels == 0 || decoder.min_dimension == 0 {
            return Err(ConfigError::Invalid("decoder limits must be non-zero".into()));
        }
        if decoder.min_dimension > decoder.max_dimension {
            return Err(ConfigError::Invalid(format!(
                "decoder.min_dimension ({}) exceeds decoder.max_dimension ({})",
                decoder.min_dimension, decoder.max_dimension
            )));
        }

        let segmentation = &self.segmentation;
        if segmentation.blur_sigma.is_nan() || segmentation.blur_sigma < 0.0 {
            return Err(ConfigError::Invalid("segmentation.blur_sigma must be >= 0".into()));
        }
        if !(segmentation.min_area_fraction > 0.0 && segmentation.min_area_fraction < 1.0) {
            return Err(ConfigError::Invalid("segmentation.min_area_fraction must be in (0, 1)".into()));
        }
        if !(segmentation.ambiguity_ratio > 0.0 && segmentation.ambiguity_ratio <= 1.0) {
            return Err(ConfigError::Invalid("segmentation.ambiguity_ratio must be in (0, 1]".into()));
        }

        let measurement = &self.measurement;
        if !(measurement.band_half_height >= 0.0 && measurement.band_half_height < 0.5) {
            return Err(ConfigError::Invalid("measurement.band_half_height must be in [0, 0.5)".into()));
        }
        for band in AnatomicalBand::iter() {
            let config = measurement.band(band);
            let valid = (0.0..=1.0).contains(&config.position)
                && config.depth_ratio > 0.0
                && config.depth_ratio <= 1.0
                && config.min_cm >= 0.0
                && config.min_cm < config.max_cm;
            if !valid {
                return Err(ConfigError::Invalid(format!("measurement.{band} settings are out of range")));
            }
        }

        let formula = &self.formula;
        if !(PERCENTAGE_FLOOR <= formula.min_percentage
            && formula.min_percentage < formula.max_percentage
            && formula.max_percentage <= PERCENTAGE_CEILING)
        {
            return Err(ConfigError::Invalid(format!(
                "formula clamp range must be ordered and within [{PERCENTAGE_FLOOR}, {PERCENTAGE_CEILING}]"
            )));
        }

        self.classification.validate()?;
        self.analysis.validate()
    }
}
