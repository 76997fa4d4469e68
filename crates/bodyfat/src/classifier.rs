use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{error::ConfigError, profile::Sex};

/// Fitness band, ordered leanest first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS,
    Display, EnumIter, IntoStaticStr,
)]
pub enum Classification {
    Essential,
    Athletes,
    Fitness,
    Average,
    Obese,
}

impl Classification {
    pub fn description(self) -> &'static str {
        match self {
            Self::Essential => "Minimum fat needed for basic physiological function; sustained levels this low carry health risks.",
            Self::Athletes => "Well-defined musculature typical of competitive athletes.",
            Self::Fitness => "Healthy, athletic appearance.",
            Self::Average => "Common range for the general adult population.",
            Self::Obese => "Body fat above the range associated with good health.",
        }
    }
}

/// Inclusive upper bounds (percent) of the four leaner bands; anything above
/// `average` is `Obese`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BandThresholds {
    pub essential: f64,
    pub athletes: f64,
    pub fitness: f64,
    pub average: f64,
}

impl BandThresholds {
    pub const fn new(essential: f64, athletes: f64, fitness: f64, average: f64) -> Self {
        Self { essential, athletes, fitness, average }
    }

    /// Boundary values fall into the leaner band
    pub fn classify(&self, percentage: f64) -> Classification {
        if percentage <= self.essential {
            Classification::Essential
        } else if percentage <= self.athletes {
            Classification::Athletes
        } else if percentage <= self.fitness {
            Classification::Fitness
        } else if percentage <= self.average {
            Classification::Average
        } else {
            Classification::Obese
        }
    }

    fn is_strictly_increasing(&self) -> bool {
        let bounds = [self.essential, self.athletes, self.fitness, self.average];
        bounds.iter().all(|b| b.is_finite()) && bounds.windows(2).all(|w| w[0] < w[1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgeBand {
    Under40,
    From40To59,
    From60,
}

impl AgeBand {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=39 => Self::Under40,
            40..=59 => Self::From40To59,
            _ => Self::From60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SexThresholds {
    pub under_40: BandThresholds,
    pub from_40_to_59: BandThresholds,
    pub from_60: BandThresholds,
}

impl SexThresholds {
    pub fn for_age_band(&self, band: AgeBand) -> &BandThresholds {
        match band {
            AgeBand::Under40 => &self.under_40,
            AgeBand::From40To59 => &self.from_40_to_59,
            AgeBand::From60 => &self.from_60,
        }
    }
}

/// Threshold tables per sex and age band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct ClassificationConfig {
    pub male: SexThresholds,
    pub female: SexThresholds,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            male: SexThresholds {
                under_40: BandThresholds::new(6.0, 14.0, 18.0, 25.0),
                from_40_to_59: BandThresholds::new(6.0, 16.0, 20.0, 27.0),
                from_60: BandThresholds::new(6.0, 18.0, 22.0, 29.0),
            },
            female: SexThresholds {
                under_40: BandThresholds::new(14.0, 21.0, 25.0, 32.0),
                from_40_to_59: BandThresholds::new(14.0, 23.0, 27.0, 34.0),
                from_60: BandThresholds::new(14.0, 24.0, 29.0, 36.0),
            },
        }
    }
}

impl ClassificationConfig {
    pub fn for_sex(&self, sex: Sex) -> &SexThresholds {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        use strum::IntoEnumIterator;

        for sex in [Sex::Male, Sex::Female] {
            for band in AgeBand::iter() {
                if !self.for_sex(sex).for_age_band(band).is_strictly_increasing() {
                    return Err(ConfigError::Invalid(format!(
                        "classification thresholds for {sex}/{band} must be finite and strictly increasing"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Maps a body-fat percentage to its fitness band
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassificationConfig,
}

impl Classifier {
    pub fn new(config: ClassificationConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, percentage: f64, sex: Sex, age: u32) -> Classification {
        self.config
            .for_sex(sex)
            .for_age_band(AgeBand::from_age(age))
            .classify(percentage)
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_boundaries_belong_to_leaner_band() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(6.0, Sex::Male, 25), Classification::Essential);
        assert_eq!(classifier.classify(6.01, Sex::Male, 25), Classification::Athletes);
        assert_eq!(classifier.classify(18.0, Sex::Male, 25), Classification::Fitness);
        assert_eq!(classifier.classify(25.0, Sex::Male, 25), Classification::Average);
        assert_eq!(classifier.classify(25.1, Sex::Male, 25), Classification::Obese);
        assert_eq!(classifier.classify(32.0, Sex::Female, 25), Classification::Average);
        assert_eq!(classifier.classify(32.1, Sex::Female, 25), Classification::Obese);
    }

    #[test]
    fn test_age_bands_shift_thresholds() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(19.0, Sex::Male, 30), Classification::Average);
        assert_eq!(classifier.classify(19.0, Sex::Male, 45), Classification::Fitness);
        assert_eq!(classifier.classify(28.0, Sex::Female, 65), Classification::Fitness);
        assert_eq!(AgeBand::from_age(39), AgeBand::Under40);
        assert_eq!(AgeBand::from_age(40), AgeBand::From40To59);
        assert_eq!(AgeBand::from_age(120), AgeBand::From60);
    }

    #[test]
    fn test_total_and_monotonic_over_clamp_range() {
        let classifier = Classifier::default();
        for sex in [Sex::Male, Sex::Female] {
            for age in [18, 45, 70] {
                let mut previous = Classification::Essential;
                let mut seen = Vec::new();
                // 2.0 to 60.0 in 0.05 steps
                for step in 0..=1160 {
                    let percentage = 2.0 + step as f64 * 0.05;
                    let label = classifier.classify(percentage, sex, age);
                    assert!(label >= previous, "{sex}/{age}: {label} after {previous} at {percentage}");
                    if !seen.contains(&label) {
                        seen.push(label);
                    }
                    previous = label;
                }
                assert_eq!(seen, Classification::iter().collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_default_tables_validate() {
        assert!(ClassificationConfig::default().validate().is_ok());

        let mut config = ClassificationConfig::default();
        config.female.from_60.fitness = 10.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
