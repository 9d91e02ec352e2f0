//! Insight CLI - Command-line interface for session insight analytics
//!
//! Commands:
//! - biomarkers: Biomarker report for a session
//! - metrics: Raw arousal/valence/stress series for a session
//! - status: Treatment status and RDoC alignment
//! - next-steps: Ordered next steps for a treatment
//! - validate: Validate a sample file
//! - trend: Classify the trend of a list of values

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, Level};

use session_insight::logging::init_tracing;
use session_insight::store::MemoryStore;
use session_insight::treatment::StaticGenerator;
use session_insight::trend::TrendCalculator;
use session_insight::types::{Outcome, Sample, TrendLabel, Window};
use session_insight::validation::{collect_issues, SampleIssue};
use session_insight::{AnalyticsConfig, AnalyticsError, InsightProcessor, VERSION};

/// Insight - Biomarker trends and treatment next steps
#[derive(Parser)]
#[command(name = "insight")]
#[command(version = VERSION)]
#[command(about = "Analyze session biomarkers and prioritize treatment next steps", long_about = None)]
struct Cli {
    /// Analytics configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Biomarker report for a session over a trailing timeframe
    Biomarkers {
        /// Store fixture path (use - for stdin)
        #[arg(short, long)]
        store: PathBuf,

        /// Session ID
        #[arg(long)]
        session: String,

        /// Look-back in days (defaults to the configured default)
        #[arg(long)]
        days: Option<u32>,

        /// End of the window as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Raw headline metric series for a session
    Metrics {
        /// Store fixture path (use - for stdin)
        #[arg(short, long)]
        store: PathBuf,

        /// Session ID
        #[arg(long)]
        session: String,

        /// Look-back in days (defaults to the configured default)
        #[arg(long)]
        days: Option<u32>,

        /// End of the window as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Treatment status and RDoC alignment
    Status {
        /// Store fixture path (use - for stdin)
        #[arg(short, long)]
        store: PathBuf,

        /// Treatment ID
        #[arg(long)]
        treatment: String,

        /// Reference time as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Ordered next steps for a treatment
    NextSteps {
        /// Store fixture path (use - for stdin)
        #[arg(short, long)]
        store: PathBuf,

        /// Treatment ID
        #[arg(long)]
        treatment: String,

        /// Captured generator recommendations (JSON array)
        #[arg(long)]
        recommendations: Option<PathBuf>,

        /// Reference time as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Validate a sample file (JSON array of samples)
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify the trend of a value series
    Trend {
        /// Values in chronological order
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Moving-average window (defaults to the configured window)
        #[arg(long)]
        window: Option<usize>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.log_json, level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), InsightCliError> {
    let config = match cli.config.as_deref() {
        Some(path) => AnalyticsConfig::from_json(&read_input(path)?)?,
        None => AnalyticsConfig::default(),
    };
    let processor = InsightProcessor::new(config);

    match cli.command {
        Commands::Biomarkers {
            store,
            session,
            days,
            at,
            format,
        } => {
            let store = load_store(&store)?;
            let timeframe = processor.timeframe(days)?;
            let report = processor
                .biomarker_report_at(&store, &session, timeframe, at.unwrap_or_else(Utc::now))
                .await?;
            println!("{}", format_output(&report, &format)?);
            Ok(())
        }

        Commands::Metrics {
            store,
            session,
            days,
            at,
            format,
        } => {
            let store = load_store(&store)?;
            let timeframe = processor.timeframe(days)?;
            let window = match at {
                Some(at) => Window::trailing(timeframe, at),
                None => Window::ending_now(timeframe),
            };
            let series = processor.metric_series(&store, &session, &window).await?;
            if series.timestamps.is_empty() {
                println!("{}", format_output(&Outcome::<()>::no_data(), &format)?);
            } else {
                println!("{}", format_output(&series, &format)?);
            }
            Ok(())
        }

        Commands::Status {
            store,
            treatment,
            at,
            format,
        } => {
            let store = load_store(&store)?;
            let status = processor
                .treatment_status_at(&store, &treatment, at.unwrap_or_else(Utc::now))
                .await?;
            println!("{}", format_output(&status, &format)?);
            Ok(())
        }

        Commands::NextSteps {
            store,
            treatment,
            recommendations,
            at,
            format,
        } => {
            let store = load_store(&store)?;
            let generator = match recommendations.as_deref() {
                Some(path) => StaticGenerator::from_json(&read_input(path)?)?,
                None => StaticGenerator::default(),
            };
            let steps = processor
                .next_steps_at(&store, &generator, &treatment, at.unwrap_or_else(Utc::now))
                .await?;
            println!("{}", format_output(&steps, &format)?);
            Ok(())
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Trend { values, window } => {
            let calculator = TrendCalculator::new(processor.config().trend);
            let window = window.unwrap_or(calculator.config().window);
            let report = TrendReport {
                window,
                values: values.len(),
                trend: calculator.trend_with_window(&values, window),
            };
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
    }
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), InsightCliError> {
    let samples: Vec<Sample> = serde_json::from_str(&read_input(input)?)?;
    let issues = collect_issues(&samples);

    let report = ValidationReport {
        total_samples: samples.len(),
        invalid_samples: issues.iter().map(|i| i.index).collect::<std::collections::BTreeSet<_>>().len(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!("  - Sample {}: {}", issue.index, issue.message);
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(InsightCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(path: &Path) -> Result<String, InsightCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_store(path: &Path) -> Result<MemoryStore, InsightCliError> {
    Ok(MemoryStore::from_json(&read_input(path)?)?)
}

fn format_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, InsightCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

// Error types

#[derive(Debug)]
enum InsightCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Analytics(AnalyticsError),
    ValidationFailed(usize),
}

impl From<io::Error> for InsightCliError {
    fn from(e: io::Error) -> Self {
        InsightCliError::Io(e)
    }
}

impl From<serde_json::Error> for InsightCliError {
    fn from(e: serde_json::Error) -> Self {
        InsightCliError::Json(e)
    }
}

impl From<AnalyticsError> for InsightCliError {
    fn from(e: AnalyticsError) -> Self {
        InsightCliError::Analytics(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<InsightCliError> for CliError {
    fn from(e: InsightCliError) -> Self {
        match e {
            InsightCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InsightCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            InsightCliError::Analytics(e @ (AnalyticsError::Store(_) | AnalyticsError::Processing(_))) => {
                error!(code = e.code(), error = %e, "internal failure");
                CliError {
                    code: "PROCESSING_ERROR".to_string(),
                    message: "Internal processing error".to_string(),
                    hint: Some("Rerun with --verbose for details".to_string()),
                }
            }
            InsightCliError::Analytics(e) => {
                let hint = match &e {
                    AnalyticsError::Validation(_) => Some("Run 'insight validate' for details"),
                    AnalyticsError::JsonError(_) => Some("Check JSON syntax"),
                    AnalyticsError::NotFound(_) => Some("Check the ID against the store fixture"),
                    _ => None,
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            InsightCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_samples: usize,
    invalid_samples: usize,
    issues: Vec<SampleIssue>,
}

#[derive(Serialize)]
struct TrendReport {
    window: usize,
    values: usize,
    trend: TrendLabel,
}
