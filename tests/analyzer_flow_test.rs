//! End-to-end flows through the analyzer with a scripted Analysis Service
//!
//! The mock service answers from a queue and records every request it sees,
//! so these tests exercise submission, retry, stale-response handling and the
//! formatted/printed output the same way the front ends drive them.

use grant_analyzer::errors::{ErrorKind, ServiceFailure};
use grant_analyzer::model::sample_result;
use grant_analyzer::pipeline::{self, render_text_report, run_to_completion};
use grant_analyzer::print::{render_print_document, PRINT_PLACEHOLDER};
use grant_analyzer::service::{AnalysisRequest, AnalysisService};
use grant_analyzer::state::{Rejected, TICK_INTERVAL};
use grant_analyzer::{
    format_results, Analyzer, AnalyzerConfig, GrantAnalysisResult, InputMode, ProcessingState,
};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Outcome = Result<GrantAnalysisResult, ServiceFailure>;

#[derive(Default)]
struct ScriptedService {
    answers: Mutex<VecDeque<Outcome>>,
    seen: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedService {
    fn new(answers: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<AnalysisRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl AnalysisService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    fn analyze(&self, request: &AnalysisRequest) -> Outcome {
        self.seen.lock().unwrap().push(request.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GrantAnalysisResult::default()))
    }
}

fn url_analyzer(url: &str) -> Analyzer {
    let mut analyzer = Analyzer::with_seed(AnalyzerConfig::default(), 7);
    analyzer.set_mode(InputMode::Url);
    assert!(analyzer.set_url(url, Instant::now()).is_valid());
    analyzer
}

#[test]
fn test_url_analysis_to_results() {
    let service = ScriptedService::new(vec![Ok(sample_result())]);
    let mut analyzer = url_analyzer("https://example.com/grant-guidelines");
    assert!(analyzer.can_submit());
    assert_eq!(analyzer.submit_label(), "Analyze URL");

    run_to_completion(&mut analyzer, service.clone()).unwrap();

    assert_eq!(
        service.requests(),
        vec![AnalysisRequest::Url(
            "https://example.com/grant-guidelines".to_string()
        )]
    );
    assert!(matches!(analyzer.state(), ProcessingState::Success { .. }));
    assert!(!analyzer.can_submit());

    let formatted = analyzer.formatted_results().unwrap();
    assert!(formatted.sections().iter().all(|s| !s.is_empty()));
    let report = render_text_report(&formatted);
    assert!(report.contains("Funding Range: $25,000 - $100,000"));

    analyzer.reset();
    assert_eq!(analyzer.state(), &ProcessingState::Idle);
    assert!(!analyzer.input().has_url());
}

#[test]
fn test_pdf_bytes_reach_service() {
    let mut file = tempfile::Builder::new()
        .prefix("guidelines")
        .suffix(".pdf")
        .tempfile()
        .unwrap();
    file.write_all(b"%PDF-1.7 grant").unwrap();

    let service = ScriptedService::new(vec![Ok(sample_result())]);
    let mut analyzer = Analyzer::with_seed(AnalyzerConfig::default(), 3);
    let candidate = pipeline::file_candidate_from_path(file.path()).unwrap();
    assert!(analyzer.select_file(candidate, Instant::now()).is_valid());
    assert_eq!(analyzer.submit_label(), "Analyze PDF");

    run_to_completion(&mut analyzer, service.clone()).unwrap();

    match service.requests().as_slice() {
        [AnalysisRequest::File { name, bytes }] => {
            assert!(name.starts_with("guidelines"));
            assert_eq!(bytes, b"%PDF-1.7 grant");
        }
        other => panic!("unexpected requests {:?}", other),
    }
    assert_eq!(analyzer.result(), Some(&sample_result()));
}

#[test]
fn test_network_failure_then_retry() {
    let service = ScriptedService::new(vec![
        Err(ServiceFailure::of_kind(ErrorKind::Network)),
        Ok(sample_result()),
    ]);
    let mut analyzer = url_analyzer("https://example.com/grants");

    run_to_completion(&mut analyzer, service.clone()).unwrap();
    let presentation = analyzer.error_presentation().unwrap();
    assert!(presentation.retryable);
    assert_eq!(presentation.auto_dismiss, None);
    // Staged input survives the failure
    assert!(analyzer.input().has_url());

    let submission = analyzer.retry(Instant::now()).unwrap();
    let (token, outcome) =
        futures::executor::block_on(pipeline::dispatch(service.clone(), submission));
    assert!(analyzer.complete(token, outcome, Instant::now()));
    assert_eq!(analyzer.result(), Some(&sample_result()));
    assert_eq!(service.requests().len(), 2);
}

#[test]
fn test_processing_failure_is_not_retryable() {
    let service = ScriptedService::new(vec![Err(ServiceFailure::processing(
        "No readable text found",
    ))]);
    let mut analyzer = url_analyzer("https://example.com/grants");

    run_to_completion(&mut analyzer, service).unwrap();
    match analyzer.state() {
        ProcessingState::Error {
            kind,
            message,
            retryable,
            ..
        } => {
            assert_eq!(*kind, ErrorKind::Processing);
            assert_eq!(message, "No readable text found");
            assert!(!retryable);
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(analyzer.retry(Instant::now()), Err(Rejected::NotRetryable));

    // A fresh submission is possible straight away
    assert!(analyzer.can_submit());
}

#[test]
fn test_deadline_turns_into_timeout_and_late_answer_is_dropped() {
    let config = AnalyzerConfig {
        processing_timeout: Duration::from_secs(5),
    };
    let mut analyzer = Analyzer::with_seed(config, 11);
    analyzer.set_mode(InputMode::Url);
    analyzer.set_url("https://example.com/grants", Instant::now());

    let start = Instant::now();
    let submission = analyzer.submit(start).unwrap();
    let mut now = start;
    while analyzer.is_processing() {
        now += TICK_INTERVAL;
        analyzer.tick(now);
        assert!(analyzer.progress() <= 90.0);
    }
    assert!(now - start >= Duration::from_secs(5));

    let presentation = analyzer.error_presentation().unwrap();
    assert_eq!(presentation.kind, ErrorKind::Timeout);
    assert!(presentation.retryable);

    let before = analyzer.state().clone();
    assert!(!analyzer.complete(submission.token, Ok(sample_result()), now));
    assert_eq!(analyzer.state(), &before);
}

#[test]
fn test_reset_discards_in_flight_response() {
    let mut analyzer = url_analyzer("https://example.com/grants");
    let first = analyzer.submit(Instant::now()).unwrap();
    analyzer.reset();

    assert!(!analyzer.complete(first.token, Ok(sample_result()), Instant::now()));
    assert_eq!(analyzer.state(), &ProcessingState::Idle);

    analyzer.set_mode(InputMode::Url);
    analyzer.set_url("https://example.com/other", Instant::now());
    let second = analyzer.submit(Instant::now()).unwrap();
    assert_ne!(first.token, second.token);
    assert!(analyzer.complete(second.token, Ok(sample_result()), Instant::now()));
}

#[test]
fn test_validation_error_auto_dismisses() {
    let mut analyzer = Analyzer::with_seed(AnalyzerConfig::default(), 5);
    analyzer.set_mode(InputMode::Url);
    let raised = Instant::now();
    // A bare host fails the URL shape check before the local-address check
    let outcome = analyzer.set_url("http://localhost:8080/grants", raised);
    assert_eq!(
        outcome.message(),
        Some("Please enter a valid web URL (e.g., https://example.com/grant-guidelines)")
    );
    let outcome = analyzer.set_url("http://localhost.example.com/grants", raised);
    assert_eq!(
        outcome.message(),
        Some("Local URLs are not supported. Please provide a public web URL.")
    );
    assert!(analyzer.needs_ticks());

    analyzer.tick(raised + Duration::from_secs(9));
    assert!(analyzer.error_presentation().is_some());
    analyzer.tick(raised + Duration::from_secs(10));
    assert!(analyzer.error_presentation().is_none());
    assert!(!analyzer.can_submit());
}

#[test]
fn test_print_matches_display_sections() {
    let service = ScriptedService::new(vec![Ok(GrantAnalysisResult {
        eligibility: vec!["Tribal <governments>".to_string()],
        ..Default::default()
    })]);
    let mut analyzer = url_analyzer("https://example.com/grants");
    run_to_completion(&mut analyzer, service).unwrap();

    let formatted = analyzer.formatted_results().unwrap();
    let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let doc = render_print_document(&formatted, day);

    assert!(doc.contains(&formatted.eligibility.markup()));
    assert!(doc.contains("Tribal &lt;governments&gt;"));
    assert_eq!(doc.matches(PRINT_PLACEHOLDER).count(), 3);
    assert!(doc.contains("on 01/31/2025"));
    assert_eq!(formatted, format_results(analyzer.result().unwrap()));
}
