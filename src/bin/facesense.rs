//! FaceSense CLI - Command-line interface for the FaceSense engine
//!
//! Commands:
//! - analyze: Score a stream of face frames and summarize the session
//! - fuse: Fuse text and face distributions into a dialogue payload
//! - doctor: Diagnose configuration and environment
//! - config: Print the effective engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use facesense::{
    rescale_probabilities, ComputeError, DialogueEncoder, EmotionEngine, EngineConfig, FusionEngine,
    LabelScores, RawFaceGeometry, RegionFeatures, FACESENSE_VERSION, PRODUCER_NAME,
};

/// FaceSense - facial and text emotion engine for dialogue agents
#[derive(Parser)]
#[command(name = "facesense")]
#[command(author = "FaceSense Contributors")]
#[command(version = FACESENSE_VERSION)]
#[command(about = "Score facial geometry and fuse it with text emotions", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a stream of frames (NDJSON) as one session
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// What each input line holds
        #[arg(long, default_value = "features")]
        input_kind: InputKind,

        /// Print the session summary instead of per-frame analyses
        #[arg(long)]
        summary: bool,

        /// Also write the session summary to this path
        #[arg(long)]
        save_summary: Option<PathBuf>,
    },

    /// Fuse a text distribution with a face distribution
    Fuse {
        /// Text emotions as a JSON object (label -> score)
        #[arg(long)]
        text: String,

        /// Face emotions as a JSON object (emotion -> score)
        #[arg(long, default_value = "{}")]
        face: String,

        /// Transcribed user utterance
        #[arg(short, long, default_value = "")]
        message: String,

        /// Text scores are probabilities in [0, 1]
        #[arg(long)]
        probabilities: bool,

        /// Session ID to embed (generated when omitted)
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Check configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputKind {
    /// Region features, one object per line
    Features,
    /// Raw landmark geometry, one object per line
    Geometry,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FaceSenseCliError> {
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Analyze {
            input,
            input_kind,
            summary,
            save_summary,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_analyze(&input, input_kind, summary, save_summary.as_deref(), config)
        }
        Commands::Fuse {
            text,
            face,
            message,
            probabilities,
            session_id,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_fuse(&text, &face, &message, probabilities, session_id, config)
        }
        Commands::Doctor { json } => cmd_doctor(cli.config.as_deref(), json),
        Commands::Config => cmd_config(cli.config.as_deref()),
    }
}

fn init_tracing(level: &str) -> Result<(), FaceSenseCliError> {
    let directive: Directive = level
        .parse()
        .map_err(|e| FaceSenseCliError::InvalidArgument(format!("invalid --log-level {level}: {e}")))?;
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, FaceSenseCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, FaceSenseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_analyze(
    input: &Path,
    input_kind: InputKind,
    summary: bool,
    save_summary: Option<&Path>,
    config: EngineConfig,
) -> Result<(), FaceSenseCliError> {
    let input_data = read_input(input)?;
    let engine = EmotionEngine::with_config(config)?;
    let mut stdout = io::stdout();

    engine.start_recording();
    for (index, line) in input_data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let analysis = match input_kind {
            InputKind::Features => {
                let features: RegionFeatures = serde_json::from_str(trimmed)
                    .map_err(|e| FaceSenseCliError::ParseError(format!("line {}: {e}", index + 1)))?;
                engine.process_frame(&features)
            }
            InputKind::Geometry => {
                let geometry: RawFaceGeometry = serde_json::from_str(trimmed)
                    .map_err(|e| FaceSenseCliError::ParseError(format!("line {}: {e}", index + 1)))?;
                engine.process_geometry(&geometry)
            }
        };

        if !summary {
            writeln!(stdout, "{}", serde_json::to_string(&analysis)?)?;
        }
    }

    if engine.frames_processed() == 0 {
        return Err(FaceSenseCliError::NoFrames);
    }

    let session = engine.stop_recording();
    if let Some(path) = save_summary {
        session.write_to_file(path)?;
        tracing::info!(path = %path.display(), "saved session summary");
    }
    if summary {
        writeln!(stdout, "{}", session.to_json_pretty()?)?;
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_fuse(
    text: &str,
    face: &str,
    message: &str,
    probabilities: bool,
    session_id: Option<String>,
    config: EngineConfig,
) -> Result<(), FaceSenseCliError> {
    let mut text: LabelScores = serde_json::from_str(text)?;
    let face: LabelScores = serde_json::from_str(face)?;
    if probabilities {
        text = rescale_probabilities(&text);
    }

    let result = FusionEngine::new(config.fusion).fuse(&text, &face);
    let encoder = match session_id {
        Some(id) => DialogueEncoder::with_session_id(id),
        None => DialogueEncoder::new(),
    };

    println!("{}", encoder.encode_to_json(&result, message)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), FaceSenseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "facesense_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("FaceSense version {}", FACESENSE_VERSION),
    });

    let config_check = match config {
        Some(path) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Config file {} does not exist", path.display()),
        },
        Some(path) => match EngineConfig::from_file(path) {
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("Config file {} is valid", path.display()),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", e),
            },
        },
        None => match EngineConfig::default().validate() {
            Ok(()) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "No config file given, using built-in defaults".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Built-in defaults are invalid: {}", e),
            },
        },
    };
    checks.push(config_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for `analyze -i -`)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FACESENSE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("FaceSense Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FaceSenseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_config(config: Option<&Path>) -> Result<(), FaceSenseCliError> {
    let config = load_config(config)?;
    println!("{}", config.to_json()?);
    Ok(())
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

// Error handling

#[derive(Debug)]
enum FaceSenseCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoFrames,
    DoctorFailed,
    ParseError(String),
    InvalidArgument(String),
}

impl From<io::Error> for FaceSenseCliError {
    fn from(e: io::Error) -> Self {
        FaceSenseCliError::Io(e)
    }
}

impl From<ComputeError> for FaceSenseCliError {
    fn from(e: ComputeError) -> Self {
        FaceSenseCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FaceSenseCliError {
    fn from(e: serde_json::Error) -> Self {
        FaceSenseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FaceSenseCliError> for CliError {
    fn from(e: FaceSenseCliError) -> Self {
        match e {
            FaceSenseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FaceSenseCliError::Compute(e @ (ComputeError::InvalidConfig(_) | ComputeError::InvalidWeights { .. })) => {
                CliError {
                    code: "CONFIG_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("Run 'facesense config' to see a valid configuration".to_string()),
                }
            }
            FaceSenseCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FaceSenseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Distributions must be JSON objects of label -> number".to_string()),
            },
            FaceSenseCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input holds one JSON object per line".to_string()),
            },
            FaceSenseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            FaceSenseCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check --input-kind matches the input lines".to_string()),
            },
            FaceSenseCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}
