use serde::Serialize;
use strum::{Display, EnumIter, IntoStaticStr};
use thiserror::Error;

use crate::types::AnatomicalBand;

/// Per-request failure. Each variant is one stage's failure kind and is
/// surfaced unchanged by the [`Estimator`](crate::Estimator).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("Invalid image: {0}")]
    Decode(String),

    #[error("No subject detected: {0}")]
    NoSubjectDetected(String),

    #[error("{band} measurement out of range: {value_cm:.1} cm (expected {min_cm}-{max_cm} cm)")]
    MeasurementOutOfRange {
        band: AnatomicalBand,
        value_cm: f64,
        min_cm: f64,
        max_cm: f64,
    },

    #[error("Formula input missing: {0}")]
    FormulaInput(String),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl EstimationError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::NoSubjectDetected(_) => ErrorKind::NoSubjectDetected,
            Self::MeasurementOutOfRange { .. } => ErrorKind::MeasurementOutOfRange,
            Self::FormulaInput(_) => ErrorKind::FormulaInput,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Client-facing status for this failure kind
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Client body for this failure. Stage detail stays in the `Display` text,
    /// which only goes to the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let kind = self.kind();
        let message = match self {
            Self::Validation { field, .. } => format!("{} Check the `{field}` field.", kind.client_message()),
            _ => kind.client_message().to_string(),
        };
        ErrorResponse {
            error: kind.to_string(),
            status: kind.status_code(),
            message,
        }
    }
}

impl From<image::ImageError> for EstimationError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum ErrorKind {
    #[strum(serialize = "DecodeError")]
    Decode,
    #[strum(serialize = "NoSubjectDetectedError")]
    NoSubjectDetected,
    #[strum(serialize = "MeasurementOutOfRangeError")]
    MeasurementOutOfRange,
    #[strum(serialize = "FormulaInputError")]
    FormulaInput,
    #[strum(serialize = "ValidationError")]
    Validation,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::MeasurementOutOfRange => 409,
            Self::Decode => 415,
            Self::NoSubjectDetected => 422,
            Self::FormulaInput => 500,
        }
    }

    pub fn client_message(self) -> &'static str {
        match self {
            Self::Decode => "The photo could not be read. Send a JPEG or PNG image whose declared type matches its content.",
            Self::NoSubjectDetected => "No single person was found in the photo. Use a full-body photo of one person against a plain background.",
            Self::MeasurementOutOfRange => "The body measurements taken from the photo are not plausible. Stand upright facing the camera with the whole body in frame.",
            Self::FormulaInput => "The estimate could not be computed from the measurements taken.",
            Self::Validation => "The request contains an invalid value.",
        }
    }
}

/// Error body returned to clients; carries the kind name, never stage internals
#[derive(Debug, Clone, Serialize, schemars::JsonSchema, ts_rs::TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
    pub message: String,
}

impl ErrorResponse {
    /// Body for a request whose worker died before producing an outcome
    pub fn internal() -> Self {
        Self {
            error: "InternalError".to_string(),
            status: 500,
            message: "The estimation did not complete.".to_string(),
        }
    }
}

/// Startup-time configuration failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config format. Please use .toml or .json files")]
    UnsupportedFileFormat,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EstimationError>;
