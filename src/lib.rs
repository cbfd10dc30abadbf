//! Grant Analyzer
//!
//! Checks grant-guideline inputs, tracks an analysis request through its
//! lifecycle, and formats the extracted eligibility, deadlines, funding and
//! document requirements for display and print.
//!
//! This library provides:
//! - `validation`: PDF and URL input checks
//! - `state`: the processing state machine (`Analyzer`)
//! - `formatter`: display-ready, escaped result sections
//! - `errors`: error taxonomy and presentation policy
//! - `print`: standalone print document
//! - `service`: Analysis Service trait and implementations
//! - `pipeline`: glue for running a service off the UI thread
//!
//! Binaries:
//! - `grant-ui`: desktop front end
//! - `grant-cli`: validate, format and analyze from the command line

pub mod config;
pub mod errors;
pub mod formatter;
pub mod model;
pub mod pipeline;
pub mod print;
pub mod service;
pub mod state;
pub mod validation;

pub use errors::{ErrorKind, ServiceFailure};
pub use formatter::{format_results, FormattedResults, FormattedSection};
pub use model::{FundingInfo, GrantAnalysisResult};
pub use state::{Analyzer, AnalyzerConfig, ProcessingState, RequestToken};
pub use validation::{FileCandidate, InputMode, InputSource, ValidationOutcome};
