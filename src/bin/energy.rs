//! Energy CLI - Command-line interface for Synheart Energy
//!
//! Commands:
//! - predict: Predict per-bin energy levels for one or more local days
//! - features: Print the feature rows for a local day
//! - validate: Validate raw sample schema
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_energy::calendar::{parse_date, parse_utc_offset};
use synheart_energy::config::{BaselinePolicy, EngineConfig};
use synheart_energy::encoder::{ForecastPayload, PredictionEncoder, FORECAST_SCHEMA_VERSION};
use synheart_energy::pipeline::EnergyProcessor;
use synheart_energy::schema::{RawSample, RawSampleAdapter, SCHEMA_VERSION};
use synheart_energy::{ENGINE_VERSION, PRODUCER_NAME};

/// Energy - On-device energy level inference
#[derive(Parser)]
#[command(name = "energy")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Predict per-slot energy levels from raw personal signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `predict` and `features`
#[derive(clap::Args)]
struct DayArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Input format
    #[arg(long, default_value = "auto")]
    input_format: InputFormat,

    /// Local calendar date (YYYY-MM-DD)
    #[arg(long)]
    date: String,

    /// Timezone as UTC or a fixed offset (e.g. "+01:00")
    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Engine config file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bin width in minutes (30 or 60)
    #[arg(long)]
    bin_width: Option<u32>,

    /// Cognitive baseline window in days
    #[arg(long)]
    baseline_days: Option<u32>,

    /// Behaviour when a cognitive baseline has no history
    #[arg(long)]
    baseline_policy: Option<PolicyArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict energy levels (energy.forecast.v1 output)
    Predict {
        #[command(flatten)]
        day: DayArgs,

        /// Number of consecutive days to predict, starting at --date
        #[arg(long, default_value = "1")]
        days: u32,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Fixed producer instance ID (random by default)
        #[arg(long)]
        instance_id: Option<String>,
    },

    /// Print the feature rows for a day
    Features {
        #[command(flatten)]
        day: DayArgs,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate raw sample schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// JSON array of samples
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Missing history counts as a baseline of zero
    ZeroFill,
    /// Missing history yields a zero delta
    RequireHistory,
}

impl From<PolicyArg> for BaselinePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::ZeroFill => BaselinePolicy::ZeroFill,
            PolicyArg::RequireHistory => BaselinePolicy::RequireHistory,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (energy.raw_sample.v1)
    Input,
    /// Output schema (energy.forecast.v1)
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
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

fn run(cli: Cli) -> Result<(), EnergyCliError> {
    match cli.command {
        Commands::Predict {
            day,
            days,
            output_format,
            instance_id,
        } => cmd_predict(&day, days, output_format, instance_id),

        Commands::Features { day, output_format } => cmd_features(&day, output_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_predict(
    args: &DayArgs,
    days: u32,
    output_format: OutputFormat,
    instance_id: Option<String>,
) -> Result<(), EnergyCliError> {
    let processor = EnergyProcessor::new(load_config(args)?);
    let date = parse_date(&args.date)?;
    let tz = parse_utc_offset(&args.timezone)?;

    let samples = read_samples(&args.input, args.input_format)?;
    if samples.is_empty() {
        warn!("No samples in input, every bin gets neutral feature values");
    }
    let store = RawSampleAdapter::into_store(samples)?;

    let encoder = match instance_id {
        Some(id) => PredictionEncoder::with_instance_id(id),
        None => PredictionEncoder::new(),
    };

    info!("Predicting {} day(s) from {} samples", days.max(1), store.len());

    let payloads: Vec<ForecastPayload> = processor
        .predict_days(&store, date, days.max(1), &tz)
        .iter()
        .map(|forecast| encoder.encode(forecast, args.timezone.trim()))
        .collect();

    write_output(&args.output, &format_output(&payloads, output_format)?)
}

fn cmd_features(args: &DayArgs, output_format: OutputFormat) -> Result<(), EnergyCliError> {
    let processor = EnergyProcessor::new(load_config(args)?);
    let date = parse_date(&args.date)?;
    let tz = parse_utc_offset(&args.timezone)?;

    let samples = read_samples(&args.input, args.input_format)?;
    if samples.is_empty() {
        warn!("No samples in input, every bin gets neutral feature values");
    }
    let store = RawSampleAdapter::into_store(samples)?;

    let features = processor.build_features(&store, date, &tz);
    write_output(&args.output, &format_output(&features.rows, output_format)?)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), EnergyCliError> {
    let samples = read_samples(input, input_format)?;
    let results = RawSampleAdapter::validate_samples(&samples);

    let report = ValidationReport {
        total_samples: samples.len(),
        valid_samples: samples.len() - results.len(),
        invalid_samples: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                sample_id: r.sample_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Sample {} (index {}): {}",
                    err.sample_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(EnergyCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), EnergyCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per raw sample, tagged by \"source\":");
                println!();
                println!("1. heart_rate - timestamp_ms, bpm (> 0)");
                println!("2. sleep      - start_ms, end_ms (null while ongoing), duration_minutes");
                println!("3. typing     - timestamp_ms, wpm, accuracy (0-100)");
                println!("   optional: total_chars, errors, duration_secs");
                println!("4. reaction   - timestamp_ms, median_ms, optional test_count");
                println!();
                println!("Every record may carry sample_id and synced.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", FORECAST_SCHEMA_VERSION);
                println!();
                println!("- producer: {{ name, version, instance_id }}");
                println!("- date, timezone, bin_width_minutes");
                println!("- quality: {{ heart_rate_coverage, has_sleep, baseline sample counts }}");
                println!("- predictions: one per bin, in order:");
                println!("  - prediction_time (epoch ms, bin start)");
                println!("  - level: LOW | MEDIUM | HIGH");
                println!("  - confidence (0-1), score (0-100), explanation");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_config(args: &DayArgs) -> Result<EngineConfig, EnergyCliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(minutes) = args.bin_width {
        config = config.with_bin_width(minutes);
    }
    if let Some(days) = args.baseline_days {
        config = config.with_baseline_window(days);
    }
    if let Some(policy) = args.baseline_policy {
        config = config.with_baseline_policy(policy.into());
    }

    debug!("Effective config: {:?}", config);
    Ok(config)
}

fn read_samples(input: &Path, format: InputFormat) -> Result<Vec<RawSample>, EnergyCliError> {
    let data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading samples from stdin (end with Ctrl-D, or pass --input <file>)");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let samples = match format {
        InputFormat::Auto => RawSampleAdapter::parse(&data)?,
        InputFormat::Ndjson => RawSampleAdapter::parse_ndjson(&data)?,
        InputFormat::Json => RawSampleAdapter::parse_array(&data)?,
    };
    Ok(samples)
}

fn write_output(output: &Path, data: &str) -> Result<(), EnergyCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: serde::Serialize>(
    records: &[T],
    format: OutputFormat,
) -> Result<String, EnergyCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn get_input_json_schema() -> String {
    let timestamp = serde_json::json!({ "type": "integer", "description": "epoch milliseconds" });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/energy.raw_sample.v1.json",
        "title": SCHEMA_VERSION,
        "description": "Synheart raw personal signal sample",
        "type": "object",
        "required": ["schema_version", "source"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "sample_id": { "type": "string" },
            "source": {
                "type": "string",
                "enum": ["heart_rate", "sleep", "typing", "reaction"]
            },
            "synced": { "type": "boolean" }
        },
        "oneOf": [
            {
                "properties": {
                    "source": { "const": "heart_rate" },
                    "timestamp_ms": timestamp,
                    "bpm": { "type": "integer", "minimum": 1 }
                },
                "required": ["timestamp_ms", "bpm"]
            },
            {
                "properties": {
                    "source": { "const": "sleep" },
                    "start_ms": timestamp,
                    "end_ms": { "type": ["integer", "null"] },
                    "duration_minutes": { "type": ["integer", "null"], "minimum": 0 }
                },
                "required": ["start_ms"]
            },
            {
                "properties": {
                    "source": { "const": "typing" },
                    "timestamp_ms": timestamp,
                    "wpm": { "type": "integer", "minimum": 0 },
                    "accuracy": { "type": "number", "minimum": 0, "maximum": 100 },
                    "total_chars": { "type": "integer", "minimum": 0 },
                    "errors": { "type": "integer", "minimum": 0 },
                    "duration_secs": { "type": "integer", "minimum": 0 }
                },
                "required": ["timestamp_ms", "wpm", "accuracy"]
            },
            {
                "properties": {
                    "source": { "const": "reaction" },
                    "timestamp_ms": timestamp,
                    "median_ms": { "type": "integer", "minimum": 0 },
                    "test_count": { "type": "integer", "minimum": 0 }
                },
                "required": ["timestamp_ms", "median_ms"]
            }
        ]
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/energy.forecast.v1.json",
        "title": FORECAST_SCHEMA_VERSION,
        "description": "Synheart per-slot energy forecast",
        "type": "object",
        "required": ["schema_version", "producer", "date", "timezone", "bin_width_minutes", "quality", "predictions"],
        "properties": {
            "schema_version": { "type": "string", "const": FORECAST_SCHEMA_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "const": PRODUCER_NAME },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "date": { "type": "string", "format": "date" },
            "timezone": { "type": "string" },
            "bin_width_minutes": { "type": "integer", "enum": [30, 60] },
            "quality": {
                "type": "object",
                "properties": {
                    "heart_rate_coverage": { "type": "number" },
                    "has_sleep": { "type": "boolean" },
                    "typing_baseline_samples": { "type": "integer" },
                    "reaction_baseline_samples": { "type": "integer" }
                }
            },
            "predictions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["prediction_time", "level", "confidence", "score", "explanation"],
                    "properties": {
                        "prediction_time": { "type": "integer" },
                        "level": { "type": "string", "enum": ["LOW", "MEDIUM", "HIGH"] },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                        "score": { "type": "number", "minimum": 0, "maximum": 100 },
                        "explanation": { "type": "string" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum EnergyCliError {
    Io(io::Error),
    Compute(synheart_energy::ComputeError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for EnergyCliError {
    fn from(e: io::Error) -> Self {
        EnergyCliError::Io(e)
    }
}

impl From<synheart_energy::ComputeError> for EnergyCliError {
    fn from(e: synheart_energy::ComputeError) -> Self {
        EnergyCliError::Compute(e)
    }
}

impl From<serde_json::Error> for EnergyCliError {
    fn from(e: serde_json::Error) -> Self {
        EnergyCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EnergyCliError> for CliError {
    fn from(e: EnergyCliError) -> Self {
        use synheart_energy::ComputeError;

        match e {
            EnergyCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EnergyCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidTimezone(_) => {
                        ("INVALID_TIMEZONE", "Use UTC or a fixed offset such as +01:00")
                    }
                    ComputeError::DateParseError(_) => ("INVALID_DATE", "Use YYYY-MM-DD"),
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Check the --config file against EngineConfig")
                    }
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input matches energy.raw_sample.v1 (run 'energy validate')",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EnergyCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EnergyCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    sample_id: Option<String>,
    error: String,
}
