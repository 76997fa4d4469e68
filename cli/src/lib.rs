use bodyfat::{
    decoder::mime_for_path, ErrorResponse, EstimationResult, Estimator, ProfileLimits, Sex,
    SubjectProfile,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Batch file contains no entries")]
    Empty,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One subject and photo to estimate
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchEntry {
    pub id: String,
    pub sex: String,
    pub age: i64,
    #[serde(alias = "altura")]
    pub height_cm: f64,
    #[serde(alias = "peso")]
    pub weight_kg: f64,
    /// Photo path; relative paths are resolved against the batch file's directory
    pub image: PathBuf,
    /// Defaults to the type implied by the image extension
    pub mime_type: Option<String>,
}

impl BatchEntry {
    pub fn profile(&self, limits: &ProfileLimits) -> bodyfat::Result<SubjectProfile> {
        SubjectProfile::new(Sex::parse(&self.sex)?, self.age, self.height_cm, self.weight_kg, limits)
    }
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchFile {
    pub entries: Vec<BatchEntry>,
}

impl BatchFile {
    /// Load a batch from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(&path)?;
        Ok(Self::from_toml(&content)?.resolve_paths(path.as_ref()))
    }

    /// Load a batch from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, BatchError> {
        let batch: BatchFile = toml::from_str(content)?;
        batch.ensure_not_empty()
    }

    /// Load a batch from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(&path)?;
        Ok(Self::from_json(&content)?.resolve_paths(path.as_ref()))
    }

    /// Load a batch from a JSON string
    pub fn from_json(content: &str) -> Result<Self, BatchError> {
        let batch: BatchFile = serde_json::from_str(content)?;
        batch.ensure_not_empty()
    }

    /// Auto-detect file format and load the batch
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(BatchError::UnsupportedFileFormat),
        }
    }

    /// Convert the batch to a TOML string
    pub fn to_toml(&self) -> Result<String, BatchError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Generate JSON schema for batch files
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BatchFile)
    }

    fn ensure_not_empty(self) -> Result<Self, BatchError> {
        if self.entries.is_empty() {
            return Err(BatchError::Empty);
        }
        Ok(self)
    }

    fn resolve_paths(mut self, batch_path: &Path) -> Self {
        if let Some(base) = batch_path.parent() {
            for entry in &mut self.entries {
                if entry.image.is_relative() {
                    entry.image = base.join(&entry.image);
                }
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Ok { result: EstimationResult },
    Rejected { error: ErrorResponse },
    Unreadable { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReportEntry {
    pub id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<BatchReportEntry>,
}

/// Estimate a single batch entry, reading its photo from disk
pub fn estimate_entry(estimator: &Estimator, entry: &BatchEntry) -> BatchOutcome {
    let bytes = match fs::read(&entry.image) {
        Ok(bytes) => bytes,
        Err(e) => {
            return BatchOutcome::Unreadable {
                message: format!("Failed to read {}: {}", entry.image.display(), e),
            };
        }
    };

    let mime_type = entry
        .mime_type
        .clone()
        .or_else(|| mime_for_path(&entry.image).map(str::to_string))
        .unwrap_or_default();

    let outcome = entry
        .profile(&estimator.config().profile)
        .and_then(|profile| estimator.estimate_bytes(&profile, &bytes, &mime_type));

    match outcome {
        Ok(result) => BatchOutcome::Ok { result },
        Err(e) => BatchOutcome::Rejected { error: e.to_response() },
    }
}

/// Run every entry on the blocking pool; the report keeps the batch order
pub async fn run_batch(estimator: Arc<Estimator>, batch: BatchFile) -> BatchReport {
    run_batch_with(batch, move |entry| estimate_entry(&estimator, entry)).await
}

/// Run `estimate` for every entry concurrently. An entry whose task dies is
/// reported as rejected rather than dropped.
pub async fn run_batch_with<F>(batch: BatchFile, estimate: F) -> BatchReport
where
    F: Fn(&BatchEntry) -> BatchOutcome + Send + Sync + 'static,
{
    let estimate = Arc::new(estimate);
    let ids: Vec<String> = batch.entries.iter().map(|entry| entry.id.clone()).collect();

    let mut tasks = JoinSet::new();
    for (index, entry) in batch.entries.into_iter().enumerate() {
        let estimate = Arc::clone(&estimate);
        tasks.spawn_blocking(move || (index, estimate(&entry)));
    }

    let mut outcomes: Vec<Option<BatchOutcome>> = vec![None; ids.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => tracing::error!("batch task failed: {e}"),
        }
    }

    let mut report = BatchReport::default();
    for (id, outcome) in ids.into_iter().zip(outcomes) {
        let outcome = outcome.unwrap_or_else(|| BatchOutcome::Rejected { error: ErrorResponse::internal() });
        match outcome {
            BatchOutcome::Ok { .. } => report.succeeded += 1,
            _ => report.failed += 1,
        }
        report.entries.push(BatchReportEntry { id, outcome });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn figure_photo(waist_px: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(200, 400, Rgb([230, 230, 225]));
        for (width, y0, y1) in [(40, 20, 60), (26, 60, 80), (80, 80, 150), (waist_px, 150, 185), (70, 185, 230), (50, 230, 380)] {
            for y in y0..y1 {
                for x in (100 - width / 2)..(100 + width / 2) {
                    image.put_pixel(x, y, Rgb([40, 45, 50]));
                }
            }
        }
        image
    }

    const BATCH_TOML: &str = r#"
[[entries]]
id = "ok"
sex = "masculino"
age = 30
altura = 180.0
peso = 75.0
image = "subject.png"

[[entries]]
id = "narrow"
sex = "female"
age = 45
height_cm = 180.0
weight_kg = 60.0
image = "narrow.png"

[[entries]]
id = "missing"
sex = "male"
age = 30
height_cm = 180.0
weight_kg = 75.0
image = "missing.png"
mime_type = "image/png"
"#;

    #[test]
    fn test_batch_toml_with_aliases() {
        let batch = BatchFile::from_toml(BATCH_TOML).unwrap();
        assert_eq!(batch.entries.len(), 3);
        assert_eq!(batch.entries[0].height_cm, 180.0);
        assert_eq!(batch.entries[0].weight_kg, 75.0);
        assert_eq!(batch.entries[0].mime_type, None);

        let round_trip = BatchFile::from_toml(&batch.to_toml().unwrap()).unwrap();
        assert_eq!(round_trip, batch);
    }

    #[test]
    fn test_empty_and_unknown_files() {
        assert!(matches!(BatchFile::from_json(r#"{"entries": []}"#), Err(BatchError::Empty)));
        assert!(matches!(BatchFile::from_file("batch.yaml"), Err(BatchError::UnsupportedFileFormat)));
    }

    #[tokio::test]
    async fn test_panicking_entry_is_reported() {
        let batch = BatchFile::from_toml(BATCH_TOML).unwrap();
        let report = run_batch_with(batch, |entry| {
            if entry.id == "narrow" {
                panic!("worker died");
            }
            BatchOutcome::Unreadable { message: "skipped".to_string() }
        })
        .await;

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.succeeded + report.failed, 3);
        let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["ok", "narrow", "missing"]);
        match &report.entries[1].outcome {
            BatchOutcome::Rejected { error } => assert_eq!(error.status, 500),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_batch_reports_each_entry() {
        let dir = tempfile::tempdir().unwrap();
        figure_photo(60).save_with_format(dir.path().join("subject.png"), ImageFormat::Png).unwrap();
        figure_photo(8).save_with_format(dir.path().join("narrow.png"), ImageFormat::Png).unwrap();
        let batch_path = dir.path().join("batch.toml");
        fs::write(&batch_path, BATCH_TOML).unwrap();

        let batch = BatchFile::from_file(&batch_path).unwrap();
        assert!(batch.entries[0].image.starts_with(dir.path()));

        let report = run_batch(Arc::new(Estimator::default()), batch).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);

        let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["ok", "narrow", "missing"]);

        assert!(matches!(report.entries[0].outcome, BatchOutcome::Ok { .. }));
        match &report.entries[1].outcome {
            BatchOutcome::Rejected { error } => assert_eq!(error.status, 409),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(report.entries[2].outcome, BatchOutcome::Unreadable { .. }));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["status"], "ok");
        assert_eq!(json["entries"][1]["error"]["error"], "MeasurementOutOfRangeError");
    }
}
