//! Advisory reading of an estimate: build, silhouette shape, health status and
//! consistency alerts. Nothing here changes the reported percentage.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{error::ConfigError, profile::Sex, types::BodyRatios};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS,
    Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BodyType {
    Lean,
    Muscular,
    Overweight,
}

/// Frontal shape from the waist-to-shoulder ratio
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS,
    Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BodyShape {
    InvertedTriangle,
    Rectangle,
    Oval,
    Round,
}

impl BodyShape {
    pub fn description(self) -> &'static str {
        match self {
            Self::InvertedTriangle => "Broad shoulders and a narrow waist.",
            Self::Rectangle => "Balanced proportions.",
            Self::Oval => "Waist somewhat wide relative to the shoulders.",
            Self::Round => "Fat concentrated around the abdomen.",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS,
    Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    LowBodyFat,
    HighBodyFat,
    Underweight,
    Overweight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SexAnalysis {
    /// Waist and hip ratios both below these mark a muscular build
    pub muscular_waist_to_shoulder: f64,
    pub muscular_hip_to_shoulder: f64,
    /// Inclusive healthy body-fat range in percent
    pub healthy_min_percentage: f64,
    pub healthy_max_percentage: f64,
}

/// Exclusive upper waist-to-shoulder bounds; anything above `oval` is `Round`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ShapeBounds {
    pub inverted_triangle: f64,
    pub rectangle: f64,
    pub oval: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AlertThresholds {
    /// BMI below `lean_bmi` with body fat above `lean_max_percentage` is flagged
    pub lean_bmi: f64,
    pub lean_max_percentage: f64,
    /// BMI above `heavy_bmi` with body fat below `heavy_min_percentage` is flagged
    pub heavy_bmi: f64,
    pub heavy_min_percentage: f64,
    /// Waist-to-shoulder above `wide_waist_to_shoulder` with body fat below `wide_waist_min_percentage` is flagged
    pub wide_waist_to_shoulder: f64,
    pub wide_waist_min_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    pub male: SexAnalysis,
    pub female: SexAnalysis,
    /// Waist-to-shoulder above this, or BMI at or above `overweight_bmi`, marks an overweight build
    pub overweight_waist_to_shoulder: f64,
    pub overweight_bmi: f64,
    pub healthy_min_bmi: f64,
    pub healthy_max_bmi: f64,
    pub shapes: ShapeBounds,
    pub alerts: AlertThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            male: SexAnalysis {
                muscular_waist_to_shoulder: 0.40,
                muscular_hip_to_shoulder: 0.85,
                healthy_min_percentage: 10.0,
                healthy_max_percentage: 22.0,
            },
            female: SexAnalysis {
                muscular_waist_to_shoulder: 0.45,
                muscular_hip_to_shoulder: 0.90,
                healthy_min_percentage: 18.0,
                healthy_max_percentage: 30.0,
            },
            overweight_waist_to_shoulder: 0.60,
            overweight_bmi: 28.0,
            healthy_min_bmi: 18.5,
            healthy_max_bmi: 24.9,
            shapes: ShapeBounds { inverted_triangle: 0.45, rectangle: 0.55, oval: 0.65 },
            alerts: AlertThresholds {
                lean_bmi: 22.0,
                lean_max_percentage: 20.0,
                heavy_bmi: 28.0,
                heavy_min_percentage: 20.0,
                wide_waist_to_shoulder: 0.70,
                wide_waist_min_percentage: 22.0,
            },
        }
    }
}

impl AnalysisConfig {
    pub fn for_sex(&self, sex: Sex) -> &SexAnalysis {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let all_finite = [
            self.overweight_waist_to_shoulder,
            self.overweight_bmi,
            self.healthy_min_bmi,
            self.healthy_max_bmi,
            self.alerts.lean_bmi,
            self.alerts.lean_max_percentage,
            self.alerts.heavy_bmi,
            self.alerts.heavy_min_percentage,
            self.alerts.wide_waist_to_shoulder,
            self.alerts.wide_waist_min_percentage,
        ]
        .iter()
        .all(|value| value.is_finite());
        if !all_finite {
            return Err(ConfigError::Invalid("analysis thresholds must be finite".into()));
        }

        for (sex, analysis) in [("male", &self.male), ("female", &self.female)] {
            if !(analysis.healthy_min_percentage < analysis.healthy_max_percentage) {
                return Err(ConfigError::Invalid(format!(
                    "analysis.{sex} healthy body-fat range must be ordered"
                )));
            }
        }
        if !(self.healthy_min_bmi < self.healthy_max_bmi) {
            return Err(ConfigError::Invalid("analysis healthy BMI range must be ordered".into()));
        }

        let ShapeBounds { inverted_triangle, rectangle, oval } = self.shapes;
        if !(0.0 < inverted_triangle && inverted_triangle < rectangle && rectangle < oval) {
            return Err(ConfigError::Invalid("analysis.shapes must be positive and strictly increasing".into()));
        }
        Ok(())
    }
}

/// Everything the analyzer adds to a result
#[derive(Debug, Clone, PartialEq)]
pub struct BodyAnalysis {
    pub body_type: Option<BodyType>,
    pub body_shape: Option<BodyShape>,
    pub health_status: HealthStatus,
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BodyAnalyzer {
    config: AnalysisConfig,
}

impl BodyAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// `body_fat_percentage` and `bmi` should be the values reported to the client
    pub fn analyze(
        &self,
        sex: Sex,
        body_fat_percentage: f64,
        bmi: f64,
        ratios: Option<&BodyRatios>,
    ) -> BodyAnalysis {
        let mut alerts = self.alerts(body_fat_percentage, bmi, ratios);
        if ratios.is_none() {
            alerts.push("Shoulder width could not be measured, so body proportions were not assessed.".to_string());
        }

        BodyAnalysis {
            body_type: ratios.map(|ratios| self.body_type(sex, bmi, ratios)),
            body_shape: ratios.map(|ratios| self.body_shape(ratios)),
            health_status: self.health_status(sex, body_fat_percentage, bmi),
            alerts,
        }
    }

    pub fn body_type(&self, sex: Sex, bmi: f64, ratios: &BodyRatios) -> BodyType {
        let thresholds = self.config.for_sex(sex);
        if ratios.waist_to_shoulder < thresholds.muscular_waist_to_shoulder
            && ratios.hip_to_shoulder < thresholds.muscular_hip_to_shoulder
        {
            BodyType::Muscular
        } else if ratios.waist_to_shoulder > self.config.overweight_waist_to_shoulder
            || bmi >= self.config.overweight_bmi
        {
            BodyType::Overweight
        } else {
            BodyType::Lean
        }
    }

    pub fn body_shape(&self, ratios: &BodyRatios) -> BodyShape {
        let bounds = &self.config.shapes;
        let ratio = ratios.waist_to_shoulder;
        if ratio < bounds.inverted_triangle {
            BodyShape::InvertedTriangle
        } else if ratio < bounds.rectangle {
            BodyShape::Rectangle
        } else if ratio < bounds.oval {
            BodyShape::Oval
        } else {
            BodyShape::Round
        }
    }

    /// Body fat is judged before BMI
    pub fn health_status(&self, sex: Sex, body_fat_percentage: f64, bmi: f64) -> HealthStatus {
        let thresholds = self.config.for_sex(sex);
        if body_fat_percentage < thresholds.healthy_min_percentage {
            HealthStatus::LowBodyFat
        } else if body_fat_percentage > thresholds.healthy_max_percentage {
            HealthStatus::HighBodyFat
        } else if bmi < self.config.healthy_min_bmi {
            HealthStatus::Underweight
        } else if bmi > self.config.healthy_max_bmi {
            HealthStatus::Overweight
        } else {
            HealthStatus::Healthy
        }
    }

    fn alerts(&self, body_fat_percentage: f64, bmi: f64, ratios: Option<&BodyRatios>) -> Vec<String> {
        let thresholds = &self.config.alerts;
        let mut alerts = Vec::new();

        if bmi < thresholds.lean_bmi && body_fat_percentage > thresholds.lean_max_percentage {
            alerts.push(format!(
                "A BMI of {bmi:.1} is unusually low for {body_fat_percentage:.1}% body fat; \
                 check that the photo shows the whole body upright."
            ));
        }
        if bmi > thresholds.heavy_bmi && body_fat_percentage < thresholds.heavy_min_percentage {
            alerts.push(format!(
                "A BMI of {bmi:.1} is unusually high for {body_fat_percentage:.1}% body fat; \
                 the estimate may be low unless the subject is very muscular."
            ));
        }
        if let Some(ratios) = ratios {
            if ratios.waist_to_shoulder > thresholds.wide_waist_to_shoulder
                && body_fat_percentage < thresholds.wide_waist_min_percentage
            {
                alerts.push(format!(
                    "The waist is wide relative to the shoulders ({:.2}); body fat may be higher than estimated.",
                    ratios.waist_to_shoulder
                ));
            }
        }
        alerts
    }
}
