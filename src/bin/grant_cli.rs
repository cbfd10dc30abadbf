//! Command-line front end for the grant analyzer.
//!
//! grant-cli validate --url https://example.com/grant-guidelines
//! grant-cli format --input result.json --output results.html
//! grant-cli analyze --file guidelines.pdf --service http --endpoint https://api.example.com/analyze
//! grant-cli config --service http --endpoint https://api.example.com/analyze

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use grant_analyzer::config::{config_path, load_settings, save_settings, ServiceKind};
use grant_analyzer::errors::present;
use grant_analyzer::pipeline::{
    file_candidate_from_path, load_result, render_text_report, run_to_completion, save_result,
};
use grant_analyzer::print::write_print_document;
use grant_analyzer::validation::{validate_file, validate_url, InputMode, ValidationOutcome};
use grant_analyzer::{format_results, Analyzer, GrantAnalysisResult, ProcessingState};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "grant-cli",
    about = "Validate grant documents and format analysis results"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "url"])))]
struct SourceArgs {
    /// PDF file to analyze
    #[arg(long)]
    file: Option<PathBuf>,

    /// Public web URL of the grant guidelines
    #[arg(long)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a PDF or URL without analyzing it
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Format a saved analysis result (JSON)
    Format {
        /// Result JSON, either bare or a service response envelope
        #[arg(short, long)]
        input: PathBuf,

        /// Write the print document (HTML) here instead of printing text
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one analysis and show the results
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Analysis service: http, sample or stub
        #[arg(long)]
        service: Option<ServiceKind>,

        /// Analysis endpoint URL (for the http service)
        #[arg(long, env = "GRANT_ANALYZER_ENDPOINT")]
        endpoint: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output file: .json saves the raw result, anything else the print document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the saved settings, updating any that are given
    Config {
        /// Default analysis service: http, sample or stub
        #[arg(long)]
        service: Option<ServiceKind>,

        /// Analysis endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Processing timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Delay before the sample service answers, in milliseconds
        #[arg(long)]
        sample_delay: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { source } => {
            let outcome = validate_source(&source)?;
            match outcome.message() {
                None => println!("Valid"),
                Some(message) => {
                    eprintln!("Invalid: {}", message);
                    std::process::exit(1);
                }
            }
        }
        Commands::Format { input, output } => {
            let result = load_result(&input)?;
            write_output(&result, output.as_deref())?;
        }
        Commands::Analyze {
            source,
            service,
            endpoint,
            timeout,
            output,
        } => {
            analyze(source, service, endpoint, timeout, output.as_deref())?;
        }
        Commands::Config {
            service,
            endpoint,
            timeout,
            sample_delay,
        } => {
            let mut settings = load_settings();
            let changed = service.is_some()
                || endpoint.is_some()
                || timeout.is_some()
                || sample_delay.is_some();
            if let Some(service) = service {
                settings.service = service;
            }
            if endpoint.is_some() {
                settings.endpoint = endpoint;
            }
            if let Some(timeout) = timeout {
                settings.timeout_secs = timeout;
            }
            if let Some(delay) = sample_delay {
                settings.sample_delay_ms = delay;
            }
            if changed {
                save_settings(&settings)?;
            }
            if let Some(path) = config_path() {
                println!("# {}", path.display());
            }
            print!("{}", settings.to_config_string());
        }
    }

    Ok(())
}

fn validate_source(source: &SourceArgs) -> Result<ValidationOutcome> {
    match (&source.file, &source.url) {
        (Some(path), _) => Ok(validate_file(&file_candidate_from_path(path)?)),
        (None, Some(url)) => Ok(validate_url(url.trim())),
        (None, None) => bail!("Provide --file or --url"),
    }
}

fn write_output(result: &GrantAnalysisResult, output: Option<&Path>) -> Result<()> {
    let formatted = format_results(result);
    match output {
        None => print!("{}", render_text_report(&formatted)),
        Some(path) if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) => {
            save_result(path, result)?;
            println!("Saved result to {}", path.display());
        }
        Some(path) => {
            let today = chrono::Local::now().date_naive();
            write_print_document(path, &formatted, today)?;
            println!("Wrote print document to {}", path.display());
        }
    }
    Ok(())
}

fn analyze(
    source: SourceArgs,
    service: Option<ServiceKind>,
    endpoint: Option<String>,
    timeout: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let mut settings = load_settings();
    if let Some(service) = service {
        settings.service = service;
    }
    if endpoint.is_some() {
        settings.endpoint = endpoint;
    }
    if let Some(timeout) = timeout {
        settings.timeout_secs = timeout;
    }

    let service = settings.build_service()?;
    let mut analyzer = Analyzer::new(settings.analyzer_config());
    let now = std::time::Instant::now();

    let staged = match (source.file, source.url) {
        (Some(path), _) => {
            analyzer.set_mode(InputMode::Pdf);
            let candidate = file_candidate_from_path(&path)?;
            analyzer.select_file(candidate, now)
        }
        (None, Some(url)) => {
            analyzer.set_mode(InputMode::Url);
            analyzer.set_url(&url, now)
        }
        (None, None) => bail!("Provide --file or --url"),
    };
    if let Some(message) = staged.message() {
        eprintln!("Invalid: {}", message);
        std::process::exit(1);
    }

    run_to_completion(&mut analyzer, service).context("Analysis could not start")?;

    match analyzer.state() {
        ProcessingState::Success { result } => write_output(result, output),
        ProcessingState::Error { kind, message, .. } => {
            let presentation = present(*kind);
            eprintln!("{} {}", presentation.icon, message);
            if presentation.retryable {
                eprintln!("This error is temporary; run the command again to retry.");
            }
            std::process::exit(2);
        }
        other => bail!("Analysis ended in an unexpected state: {:?}", other),
    }
}
