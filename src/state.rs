//! Processing state machine
//!
//! [`Analyzer`] is the single owner of the staged input, the processing state
//! and the progress estimate. Front ends feed it events (input changes,
//! submit, service completions, clock ticks) and render whatever state it is
//! in; no other code mutates it.
//!
//! Every submission mints a fresh [`RequestToken`]. A service completion is
//! applied only while the machine is processing that same token, so a
//! response belonging to a cancelled, reset, timed-out or superseded request
//! is discarded.

use crate::errors::{present, ErrorKind, ErrorPresentation, ServiceFailure};
use crate::formatter::{format_results, FormattedResults};
use crate::model::GrantAnalysisResult;
use crate::validation::{
    validate_file, validate_inputs, validate_url, FileCandidate, InputMode, InputSource,
    StagedInput, ValidationOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::{Duration, Instant};

/// How often the progress estimator should be ticked while processing.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Displayed progress never passes this until the service has answered.
pub const PROGRESS_CEILING: f32 = 90.0;

/// Largest pseudo-random step per tick, in percent.
pub const MAX_PROGRESS_STEP: f32 = 15.0;

const STAGE_ANALYZING: &str = "Analyzing content with AI...";
const STAGE_FORMATTING: &str = "Formatting results...";

/// Identifies one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request #{}", self.0)
    }
}

/// A request the front end must hand to the Analysis Service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub token: RequestToken,
    pub source: InputSource,
}

/// Why a submit or retry was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    /// A request is already in flight, or results are showing and need a reset.
    Busy,
    /// The current error does not offer a retry.
    NotRetryable,
    /// The staged input failed validation.
    Invalid(String),
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejected::Busy => write!(f, "An analysis is already in progress or showing."),
            Rejected::NotRetryable => write!(f, "This error cannot be retried."),
            Rejected::Invalid(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Rejected {}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingState {
    Idle,
    ReadyToSubmit,
    Processing {
        token: RequestToken,
        message: String,
        started_at: Instant,
    },
    Success {
        result: GrantAnalysisResult,
    },
    Error {
        kind: ErrorKind,
        message: String,
        retryable: bool,
        raised_at: Instant,
    },
}

// ============================================================================
// Progress estimator
// ============================================================================

/// Simulated progress for a request whose real progress is unknown.
///
/// The value only moves up while running, stays at or below
/// [`PROGRESS_CEILING`] until [`finish`](Self::finish), and ignores advances
/// once stopped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEstimator {
    value: f32,
    running: bool,
}

impl ProgressEstimator {
    pub fn start(&mut self) {
        self.value = 0.0;
        self.running = true;
    }

    pub fn advance(&mut self, step: f32) -> f32 {
        if self.running && step.is_finite() {
            self.value = (self.value + step.max(0.0)).min(PROGRESS_CEILING);
        }
        self.value
    }

    /// Jump to 100% and stop.
    pub fn finish(&mut self) {
        self.value = 100.0;
        self.running = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Processing longer than this becomes a timeout error.
    pub processing_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            processing_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct Analyzer {
    input: StagedInput,
    state: ProcessingState,
    progress: ProgressEstimator,
    next_token: u64,
    config: AnalyzerConfig,
    rng: StdRng,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Analyzer with reproducible progress steps.
    pub fn with_seed(config: AnalyzerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: AnalyzerConfig, rng: StdRng) -> Self {
        Self {
            input: StagedInput::default(),
            state: ProcessingState::Idle,
            progress: ProgressEstimator::default(),
            next_token: 1,
            config,
            rng,
        }
    }

    // -- Queries --

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn input(&self) -> &StagedInput {
        &self.input
    }

    pub fn progress(&self) -> f32 {
        self.progress.value()
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, ProcessingState::Processing { .. })
    }

    /// Token of the request currently in flight.
    pub fn current_token(&self) -> Option<RequestToken> {
        match self.state {
            ProcessingState::Processing { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Whether the staged input may be edited right now.
    pub fn accepts_input(&self) -> bool {
        matches!(
            self.state,
            ProcessingState::Idle | ProcessingState::ReadyToSubmit | ProcessingState::Error { .. }
        )
    }

    /// Whether the submit affordance should be enabled.
    pub fn can_submit(&self) -> bool {
        self.accepts_input() && validate_inputs(&self.input).is_valid()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_processing() {
            "Processing..."
        } else {
            self.input.submit_label()
        }
    }

    pub fn stage_message(&self) -> Option<&str> {
        match &self.state {
            ProcessingState::Processing { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&GrantAnalysisResult> {
        match &self.state {
            ProcessingState::Success { result } => Some(result),
            _ => None,
        }
    }

    /// Display sections for the current result, derived fresh on each call.
    pub fn formatted_results(&self) -> Option<FormattedResults> {
        self.result().map(format_results)
    }

    pub fn error_presentation(&self) -> Option<ErrorPresentation> {
        match self.state {
            ProcessingState::Error { kind, .. } => Some(present(kind)),
            _ => None,
        }
    }

    /// True while something time-driven is pending: progress or auto-dismiss.
    pub fn needs_ticks(&self) -> bool {
        self.progress.is_running()
            || self
                .error_presentation()
                .is_some_and(|p| p.auto_dismiss.is_some())
    }

    // -- Input events --

    pub fn set_mode(&mut self, mode: InputMode) {
        if !self.accepts_input() {
            log::debug!("Ignoring mode change while {}", self.state_name());
            return;
        }
        self.input.mode = mode;
        self.input_changed();
    }

    /// Stage a picked file. A file that fails validation is not staged.
    pub fn select_file(&mut self, candidate: FileCandidate, now: Instant) -> ValidationOutcome {
        if !self.accepts_input() {
            return ValidationOutcome::Invalid(Rejected::Busy.to_string());
        }
        let outcome = validate_file(&candidate);
        match &outcome {
            ValidationOutcome::Valid => {
                log::info!("Staged file {} ({} bytes)", candidate.name, candidate.size_bytes);
                self.input.file = Some(candidate);
                self.input_changed();
            }
            ValidationOutcome::Invalid(message) => {
                log::info!("Rejected file {}: {}", candidate.name, message);
                self.fail(ErrorKind::Validation, message.clone(), now);
            }
        }
        outcome
    }

    pub fn remove_file(&mut self) {
        if !self.accepts_input() {
            return;
        }
        self.input.file = None;
        self.input_changed();
    }

    /// Stage URL text (trimmed). Non-empty text that is not a valid URL stays
    /// staged and raises a validation error.
    pub fn set_url(&mut self, text: &str, now: Instant) -> ValidationOutcome {
        if !self.accepts_input() {
            return ValidationOutcome::Invalid(Rejected::Busy.to_string());
        }
        self.input.url = text.trim().to_string();
        if self.input.url.is_empty() {
            self.input_changed();
            return ValidationOutcome::Valid;
        }

        let outcome = validate_url(&self.input.url);
        match &outcome {
            ValidationOutcome::Valid => self.input_changed(),
            ValidationOutcome::Invalid(message) => {
                self.fail(ErrorKind::Validation, message.clone(), now)
            }
        }
        outcome
    }

    fn input_changed(&mut self) {
        self.state = if validate_inputs(&self.input).is_valid() {
            ProcessingState::ReadyToSubmit
        } else {
            ProcessingState::Idle
        };
    }

    // -- Submission --

    /// Re-validate and start processing the active input.
    pub fn submit(&mut self, now: Instant) -> Result<Submission, Rejected> {
        if !self.accepts_input() {
            return Err(Rejected::Busy);
        }

        let outcome = validate_inputs(&self.input);
        let source = match (outcome, self.input.active_source()) {
            (ValidationOutcome::Valid, Some(source)) => source,
            (ValidationOutcome::Invalid(message), _) => {
                self.fail(ErrorKind::Validation, message.clone(), now);
                return Err(Rejected::Invalid(message));
            }
            (ValidationOutcome::Valid, None) => {
                let message = ErrorKind::Validation.default_message().to_string();
                self.fail(ErrorKind::Validation, message.clone(), now);
                return Err(Rejected::Invalid(message));
            }
        };

        let token = RequestToken(self.next_token);
        self.next_token += 1;

        let message = match source {
            InputSource::File(_) => "Extracting text from PDF...",
            InputSource::Url(_) => "Fetching content from URL...",
        };
        self.progress.start();
        self.state = ProcessingState::Processing {
            token,
            message: message.to_string(),
            started_at: now,
        };
        log::info!("Submitted {} ({} mode)", token, self.input.mode);

        Ok(Submission { token, source })
    }

    /// Submit again after a network or timeout error.
    pub fn retry(&mut self, now: Instant) -> Result<Submission, Rejected> {
        match self.state {
            ProcessingState::Error {
                retryable: true, ..
            } => self.submit(now),
            ProcessingState::Error { .. } => Err(Rejected::NotRetryable),
            _ => Err(Rejected::Busy),
        }
    }

    /// Apply a service response. Returns `false` when the response is stale
    /// and was discarded.
    pub fn complete(
        &mut self,
        token: RequestToken,
        outcome: Result<GrantAnalysisResult, ServiceFailure>,
        now: Instant,
    ) -> bool {
        if self.current_token() != Some(token) {
            log::debug!("Discarding stale response for {}", token);
            return false;
        }

        match outcome {
            Ok(result) => {
                log::info!("Analysis complete for {}", token);
                self.progress.finish();
                self.state = ProcessingState::Success { result };
            }
            Err(failure) => {
                log::warn!("Analysis failed for {}: {}", token, failure);
                let message = if failure.message.trim().is_empty() {
                    failure.kind.default_message().to_string()
                } else {
                    failure.message
                };
                self.fail(failure.kind, message, now);
            }
        }
        true
    }

    /// Advance the clock: step the progress estimate, enforce the processing
    /// deadline and auto-dismiss errors whose display time has passed.
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            ProcessingState::Processing { started_at, .. } => {
                if now.saturating_duration_since(started_at) >= self.config.processing_timeout {
                    log::warn!("Processing exceeded {:?}", self.config.processing_timeout);
                    self.fail(
                        ErrorKind::Timeout,
                        ErrorKind::Timeout.default_message().to_string(),
                        now,
                    );
                    return;
                }
                let step = self.rng.random_range(0.0..MAX_PROGRESS_STEP);
                let value = self.progress.advance(step);
                if let ProcessingState::Processing { message, .. } = &mut self.state {
                    if value > 60.0 {
                        *message = STAGE_FORMATTING.to_string();
                    } else if value > 30.0 {
                        *message = STAGE_ANALYZING.to_string();
                    }
                }
            }
            ProcessingState::Error {
                kind, raised_at, ..
            } => {
                if let Some(after) = present(kind).auto_dismiss {
                    if now.saturating_duration_since(raised_at) >= after {
                        self.dismiss_error();
                    }
                }
            }
            _ => {}
        }
    }

    // -- Leaving states --

    /// Clear a displayed error, keeping the staged input.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, ProcessingState::Error { .. }) {
            self.input_changed();
        }
    }

    /// Abandon the request in flight, keeping the staged input.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current_token() {
            log::info!("Cancelled {}", token);
            self.progress.stop();
            self.input_changed();
        }
    }

    /// Back to a blank form from any state.
    pub fn reset(&mut self) {
        self.progress.stop();
        self.input.clear();
        self.state = ProcessingState::Idle;
    }

    fn fail(&mut self, kind: ErrorKind, message: String, now: Instant) {
        self.progress.stop();
        self.state = ProcessingState::Error {
            kind,
            message,
            retryable: kind.is_retryable(),
            raised_at: now,
        };
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            ProcessingState::Idle => "idle",
            ProcessingState::ReadyToSubmit => "ready",
            ProcessingState::Processing { .. } => "processing",
            ProcessingState::Success { .. } => "success",
            ProcessingState::Error { .. } => "error",
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
