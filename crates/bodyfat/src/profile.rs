use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{EstimationError, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, schemars::JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Sex {
    #[serde(alias = "masculino")]
    #[strum(to_string = "male", serialize = "masculino", serialize = "m")]
    Male,
    #[serde(alias = "feminino")]
    #[strum(to_string = "female", serialize = "feminino", serialize = "f")]
    Female,
}

impl Sex {
    /// Parse a client-supplied label, mapping failures to a validation error
    pub fn parse(raw: &str) -> Result<Self> {
        Self::from_str(raw.trim()).map_err(|_| {
            EstimationError::validation(
                "sex",
                format!("expected one of male, female, masculino, feminino; got '{raw}'"),
            )
        })
    }
}

/// Accepted ranges for subject attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct ProfileLimits {
    pub min_age: u32,
    pub max_age: u32,
    pub min_height_cm: f64,
    pub max_height_cm: f64,
    pub min_weight_kg: f64,
    pub max_weight_kg: f64,
}

impl Default for ProfileLimits {
    fn default() -> Self {
        Self {
            min_age: 1,
            max_age: 120,
            min_height_cm: 50.0,
            max_height_cm: 272.0,
            min_weight_kg: 2.0,
            max_weight_kg: 650.0,
        }
    }
}

/// Validated anthropometric inputs for one subject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectProfile {
    sex: Sex,
    age: u32,
    height_cm: f64,
    weight_kg: f64,
}

impl SubjectProfile {
    pub fn new(
        sex: Sex,
        age: i64,
        height_cm: f64,
        weight_kg: f64,
        limits: &ProfileLimits,
    ) -> Result<Self> {
        if age < limits.min_age as i64 || age > limits.max_age as i64 {
            return Err(EstimationError::validation(
                "age",
                format!("must be between {} and {} years, got {age}", limits.min_age, limits.max_age),
            ));
        }
        check_range("height_cm", height_cm, limits.min_height_cm, limits.max_height_cm)?;
        check_range("weight_kg", weight_kg, limits.min_weight_kg, limits.max_weight_kg)?;

        Ok(Self {
            sex,
            age: age as u32,
            height_cm,
            weight_kg,
        })
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm / 100.0;
        self.weight_kg / (height_m * height_m)
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EstimationError::validation(field, format!("must be a positive number, got {value}")));
    }
    if value < min || value > max {
        return Err(EstimationError::validation(field, format!("must be between {min} and {max}, got {value}")));
    }
    Ok(())
}
