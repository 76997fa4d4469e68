use bodyfat::{decoder::mime_for_path, EstimationRequest, Estimator, EstimatorConfig, Sex, SubjectProfile};
use bodyfat_cli::{run_batch, BatchFile};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Estimator configuration (.toml or .json); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate body fat for one subject from a photo
    Estimate {
        /// Path to the full-body photo (JPEG or PNG)
        #[arg(short, long)]
        image: PathBuf,
        /// Biological sex: male/female (masculino/feminino also accepted)
        #[arg(long)]
        sex: String,
        /// Age in years
        #[arg(long)]
        age: i64,
        /// Height in centimeters
        #[arg(long)]
        height: f64,
        /// Weight in kilograms
        #[arg(long)]
        weight: f64,
        /// MIME type of the photo; inferred from the extension if not specified
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Estimate every entry of a batch file concurrently
    Batch {
        /// Path to the batch file (.toml or .json)
        file: PathBuf,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective estimator configuration
    Config {
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value = "request")]
        target: SchemaTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaTarget {
    Request,
    Config,
    Batch,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Results go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Estimate { image, sex, age, height, weight, mime_type } => {
            let estimator = Estimator::new(config)?;
            estimate(&estimator, &image, &sex, age, height, weight, mime_type).await?;
        }
        Commands::Batch { file, output } => {
            let estimator = Arc::new(Estimator::new(config)?);
            batch(estimator, &file, output.as_deref()).await?;
        }
        Commands::Config { format } => {
            let rendered = match format {
                ConfigFormat::Toml => config.to_toml()?,
                ConfigFormat::Json => config.to_json()?,
            };
            println!("{rendered}");
        }
        Commands::Schema { target } => {
            let schema = match target {
                SchemaTarget::Request => serde_json::to_string_pretty(&EstimationRequest::schema())?,
                SchemaTarget::Config => serde_json::to_string_pretty(&EstimatorConfig::schema())?,
                SchemaTarget::Batch => serde_json::to_string_pretty(&BatchFile::schema())?,
            };
            println!("{schema}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EstimatorConfig> {
    match path {
        Some(path) => {
            info!("Loading estimator config from {:?}", path);
            Ok(EstimatorConfig::from_file(path)?)
        }
        None => Ok(EstimatorConfig::default()),
    }
}

async fn estimate(
    estimator: &Estimator,
    image: &Path,
    sex: &str,
    age: i64,
    height_cm: f64,
    weight_kg: f64,
    mime_type: Option<String>,
) -> Result<()> {
    let mime_type = mime_type
        .or_else(|| mime_for_path(image).map(str::to_string))
        .ok_or_else(|| eyre!("Cannot infer the MIME type of {:?}; pass --mime-type", image))?;

    let bytes = tokio::fs::read(image).await?;
    info!("Estimating from {:?} ({} bytes)", image, bytes.len());

    let outcome = Sex::parse(sex)
        .and_then(|sex| SubjectProfile::new(sex, age, height_cm, weight_kg, &estimator.config().profile))
        .and_then(|profile| estimator.estimate_bytes(&profile, &bytes, &mime_type));
    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            Err(e.into())
        }
    }
}

async fn batch(estimator: Arc<Estimator>, file: &Path, output: Option<&Path>) -> Result<()> {
    let batch = BatchFile::from_file(file)?;
    info!("Running {} batch entries from {:?}", batch.entries.len(), file);

    let report = run_batch(estimator, batch).await;
    info!("✅ Batch completed: {} succeeded, {} failed", report.succeeded, report.failed);

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}
