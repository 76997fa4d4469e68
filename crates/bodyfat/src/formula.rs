//! U.S. Navy circumference method (Hodgdon & Beckett, 1984), metric form.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{EstimationError, Result},
    profile::{Sex, SubjectProfile},
    types::{AnatomicalBand, DerivedMeasurements},
};

/// Smallest argument passed to `log10`, in centimeters
const MIN_LOG_ARGUMENT_CM: f64 = 1.0;

/// Sex-specific formula, chosen once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaVariant {
    /// Uses neck and waist
    Male,
    /// Uses neck, waist and hip
    Female,
}

impl FormulaVariant {
    pub fn for_sex(sex: Sex) -> Self {
        match sex {
            Sex::Male => Self::Male,
            Sex::Female => Self::Female,
        }
    }

    pub fn required_bands(self) -> &'static [AnatomicalBand] {
        match self {
            Self::Male => &[AnatomicalBand::Neck, AnatomicalBand::Waist],
            Self::Female => &[AnatomicalBand::Neck, AnatomicalBand::Waist, AnatomicalBand::Hip],
        }
    }

    pub fn requires(self, band: AnatomicalBand) -> bool {
        self.required_bands().contains(&band)
    }
}

/// Outer limits of any reported body-fat percentage; a configured clamp range must lie inside them
pub const PERCENTAGE_FLOOR: f64 = 2.0;
pub const PERCENTAGE_CEILING: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct FormulaConfig {
    pub min_percentage: f64,
    pub max_percentage: f64,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            min_percentage: PERCENTAGE_FLOOR,
            max_percentage: PERCENTAGE_CEILING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaOutput {
    /// Value before clamping; may be non-finite for degenerate inputs
    pub raw_percentage: f64,
    pub percentage: f64,
    pub clamped: bool,
}

#[derive(Debug, Clone)]
pub struct BodyFatFormula {
    config: FormulaConfig,
}

impl BodyFatFormula {
    pub fn new(config: FormulaConfig) -> Self {
        Self { config }
    }

    pub fn compute(
        &self,
        profile: &SubjectProfile,
        measurements: &DerivedMeasurements,
    ) -> Result<FormulaOutput> {
        let variant = FormulaVariant::for_sex(profile.sex());
        let height = profile.height_cm();
        let neck = measurements.neck_cm;
        let waist = measurements.waist_cm;

        let raw_percentage = match variant {
            FormulaVariant::Male => {
                let girth = log_argument("waist - neck", waist - neck);
                495.0 / (1.0324 - 0.19077 * girth.log10() + 0.15456 * height.log10()) - 450.0
            }
            FormulaVariant::Female => {
                let hip = measurements.hip_cm.ok_or_else(|| {
                    EstimationError::FormulaInput(
                        "hip circumference is required for the female formula".to_string(),
                    )
                })?;
                let girth = log_argument("waist + hip - neck", waist + hip - neck);
                495.0 / (1.29579 - 0.35004 * girth.log10() + 0.22100 * height.log10()) - 450.0
            }
        };

        debug!(?variant, raw_percentage, "body fat formula evaluated");
        Ok(self.clamp(raw_percentage))
    }

    fn clamp(&self, raw_percentage: f64) -> FormulaOutput {
        let FormulaConfig { min_percentage, max_percentage } = self.config;

        let percentage = if raw_percentage.is_nan() {
            max_percentage
        } else {
            raw_percentage.clamp(min_percentage, max_percentage)
        };
        let clamped = percentage != raw_percentage;

        if clamped {
            warn!(
                raw_percentage,
                percentage,
                "body fat outside [{min_percentage}, {max_percentage}], clamped to boundary"
            );
        }

        FormulaOutput { raw_percentage, percentage, clamped }
    }
}

impl Default for BodyFatFormula {
    fn default() -> Self {
        Self::new(FormulaConfig::default())
    }
}

fn log_argument(label: &str, value: f64) -> f64 {
    if value < MIN_LOG_ARGUMENT_CM {
        warn!(value, "{label} below {MIN_LOG_ARGUMENT_CM} cm, flooring log argument");
        MIN_LOG_ARGUMENT_CM
    } else {
        value
    }
}
