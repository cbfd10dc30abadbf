//! Pipeline functions shared by the CLI and the GUI.
//!
//! Turns staged input into service requests, runs the service off the caller's
//! thread and reports the outcome tagged with its request token.

use crate::errors::ServiceFailure;
use crate::formatter::FormattedResults;
use crate::model::GrantAnalysisResult;
use crate::service::{parse_envelope, AnalysisRequest, AnalysisService};
use crate::state::{Analyzer, Rejected, RequestToken, Submission, TICK_INTERVAL};
use crate::validation::{FileCandidate, InputSource};
use anyhow::{anyhow, Context, Result};
use futures::channel::oneshot;
use std::fmt::Write;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Placeholder for empty sections in text output.
pub const TEXT_PLACEHOLDER: &str = "Information not found in document";

pub type AnalysisOutcome = Result<GrantAnalysisResult, ServiceFailure>;

// ============================================================================
// Requests
// ============================================================================

/// Describe a file on disk for validation. The bytes are not read yet.
pub fn file_candidate_from_path(path: &Path) -> Result<FileCandidate> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file info: {}", path.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("Not a file: {}", path.display()));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(FileCandidate::new(name, metadata.len()).with_path(path))
}

/// Build the payload for a validated source.
pub fn build_request(source: &InputSource) -> Result<AnalysisRequest, ServiceFailure> {
    match source {
        InputSource::Url(url) => Ok(AnalysisRequest::Url(url.clone())),
        InputSource::File(candidate) => {
            let path = candidate.path.as_ref().ok_or_else(|| {
                ServiceFailure::processing(format!("No file location known for {}.", candidate.name))
            })?;
            let bytes = std::fs::read(path).map_err(|e| {
                log::warn!("Failed to read {}: {}", path.display(), e);
                ServiceFailure::processing(format!("Could not read {}: {}", candidate.name, e))
            })?;
            Ok(AnalysisRequest::File {
                name: candidate.name.clone(),
                bytes,
            })
        }
    }
}

/// Build the request and call the service, blocking the current thread.
pub fn run_submission(service: &dyn AnalysisService, submission: &Submission) -> AnalysisOutcome {
    let request = build_request(&submission.source)?;
    log::info!(
        "{}: {} analysis of {}",
        submission.token,
        service.name(),
        request.describe()
    );
    service.analyze(&request)
}

// ============================================================================
// Background dispatch
// ============================================================================

/// Run the submission on a worker thread. The receiver resolves exactly once.
pub fn spawn_worker(
    service: Arc<dyn AnalysisService>,
    submission: Submission,
) -> oneshot::Receiver<AnalysisOutcome> {
    let (tx, rx) = oneshot::channel();

    std::thread::spawn(move || {
        let outcome = run_submission(service.as_ref(), &submission);
        if tx.send(outcome).is_err() {
            log::debug!("{}: receiver dropped before completion", submission.token);
        }
    });

    rx
}

fn worker_stopped() -> ServiceFailure {
    ServiceFailure::processing("The analysis worker stopped unexpectedly.")
}

/// Future resolving to the token and outcome of one submission.
pub fn dispatch(
    service: Arc<dyn AnalysisService>,
    submission: Submission,
) -> impl Future<Output = (RequestToken, AnalysisOutcome)> + Send + 'static {
    let token = submission.token;
    let rx = spawn_worker(service, submission);
    async move {
        let outcome = rx.await.unwrap_or_else(|_| Err(worker_stopped()));
        (token, outcome)
    }
}

/// Submit the staged input and drive the analyzer until processing ends,
/// ticking it at the usual interval so progress and the deadline apply.
pub fn run_to_completion(
    analyzer: &mut Analyzer,
    service: Arc<dyn AnalysisService>,
) -> Result<(), Rejected> {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    let submission = analyzer.submit(Instant::now())?;
    let token = submission.token;
    let mut rx = spawn_worker(service, submission);
    let mut last_tick = Instant::now();

    while analyzer.is_processing() {
        match rx.try_recv() {
            Ok(Some(outcome)) => {
                analyzer.complete(token, outcome, Instant::now());
            }
            Ok(None) => {
                std::thread::sleep(POLL_INTERVAL);
                if last_tick.elapsed() >= TICK_INTERVAL {
                    last_tick = Instant::now();
                    analyzer.tick(last_tick);
                    log::debug!("{:.0}% {}", analyzer.progress(), analyzer.stage_message().unwrap_or(""));
                }
            }
            Err(_) => {
                analyzer.complete(token, Err(worker_stopped()), Instant::now());
            }
        }
    }

    Ok(())
}

// ============================================================================
// Result files and text output
// ============================================================================

/// Load a saved result. Accepts a bare result or a service response envelope.
pub fn load_result(path: &Path) -> Result<GrantAnalysisResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    if value.get("success").is_some() {
        return parse_envelope(200, &text).map_err(|failure| anyhow!(failure));
    }
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a grant analysis result", path.display()))
}

pub fn save_result(path: &Path, result: &GrantAnalysisResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Plain-text rendering of the four sections.
pub fn render_text_report(results: &FormattedResults) -> String {
    let mut out = String::new();
    for section in results.sections() {
        let title = section.kind.title();
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
        if section.is_empty() {
            let _ = writeln!(out, "  {}", TEXT_PLACEHOLDER);
        }
        for fragment in &section.fragments {
            let _ = writeln!(out, "  {} {}", fragment.glyph.symbol(), fragment.to_plain_text());
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::formatter::format_results;
    use crate::model::sample_result;
    use crate::service::{SampleAnalysisService, StubAnalysisService};
    use crate::state::{AnalyzerConfig, ProcessingState};
    use crate::validation::InputMode;
    use std::io::Write as _;

    #[test]
    fn test_file_candidate_from_path() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();
        let candidate = file_candidate_from_path(file.path()).unwrap();
        assert!(candidate.name.ends_with(".pdf"));
        assert_eq!(candidate.size_bytes, 13);
        assert_eq!(candidate.path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_file_candidate_missing() {
        assert!(file_candidate_from_path(Path::new("/nonexistent/grant.pdf")).is_err());
    }

    #[test]
    fn test_build_request_reads_bytes() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF").unwrap();
        let candidate = file_candidate_from_path(file.path()).unwrap();
        match build_request(&InputSource::File(candidate)).unwrap() {
            AnalysisRequest::File { bytes, .. } => assert_eq!(bytes, b"%PDF"),
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_file_is_processing_failure() {
        let candidate = FileCandidate::new("gone.pdf", 10).with_path("/nonexistent/gone.pdf");
        let failure = build_request(&InputSource::File(candidate)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Processing);
    }

    #[test]
    fn test_dispatch_resolves_with_token() {
        let mut analyzer = Analyzer::with_seed(AnalyzerConfig::default(), 1);
        analyzer.set_mode(InputMode::Url);
        analyzer.set_url("https://example.com/grants", Instant::now());
        let submission = analyzer.submit(Instant::now()).unwrap();
        let expected = submission.token;

        let (token, outcome) = futures::executor::block_on(dispatch(
            Arc::new(SampleAnalysisService::new(Duration::ZERO)),
            submission,
        ));
        assert_eq!(token, expected);
        assert_eq!(outcome.unwrap(), sample_result());
    }

    #[test]
    fn test_run_to_completion() {
        let mut analyzer = Analyzer::with_seed(AnalyzerConfig::default(), 2);
        analyzer.set_mode(InputMode::Url);
        analyzer.set_url("https://example.com/grants", Instant::now());
        run_to_completion(&mut analyzer, Arc::new(StubAnalysisService)).unwrap();
        assert!(matches!(analyzer.state(), ProcessingState::Success { .. }));
        assert_eq!(analyzer.progress(), 100.0);
    }

    #[test]
    fn test_load_result_bare_and_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare.json");
        save_result(&bare, &sample_result()).unwrap();
        assert_eq!(load_result(&bare).unwrap(), sample_result());

        let envelope = dir.path().join("envelope.json");
        std::fs::write(
            &envelope,
            r#"{"success": true, "data": {"eligibility": ["Schools"]}}"#,
        )
        .unwrap();
        assert_eq!(load_result(&envelope).unwrap().eligibility, vec!["Schools"]);

        let failed = dir.path().join("failed.json");
        std::fs::write(&failed, r#"{"success": false, "error": {"message": "nope"}}"#).unwrap();
        assert!(load_result(&failed).is_err());
    }

    #[test]
    fn test_text_report() {
        let report = render_text_report(&format_results(&GrantAnalysisResult::default()));
        assert_eq!(report.matches(TEXT_PLACEHOLDER).count(), 4);

        let report = render_text_report(&format_results(&sample_result()));
        assert!(report.contains("Eligibility Checklist\n---------------------\n"));
        assert!(!report.contains("<"));
    }
}
