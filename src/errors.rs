//! Error categories and how each one is presented
//!
//! Validation errors block submission until the input changes. Network and
//! timeout errors offer a retry and stay on screen until dismissed.
//! Processing errors mean the input itself could not be analyzed; they
//! dismiss themselves after a while.

use std::fmt;
use std::time::Duration;

/// How long auto-dismissed errors stay visible.
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Network,
    Processing,
    Timeout,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }

    /// Message used when a failure arrives without one.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Please provide either a PDF file or a URL to analyze.",
            ErrorKind::Network => {
                "Network connection failed. Please check your internet connection and try again."
            }
            ErrorKind::Processing => {
                "Unable to process the document. Please ensure it contains readable text."
            }
            ErrorKind::Timeout => "Processing timed out. The document may be too large or complex.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Processing => "processing",
            ErrorKind::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// A failed analysis as reported by the Analysis Service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure carrying the standard message for its kind.
    pub fn of_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Processing, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceFailure {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Caution,
}

/// Display metadata for one error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPresentation {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub icon: &'static str,
    /// Whether a one-click retry is offered.
    pub retryable: bool,
    /// `None` means the error stays until the user dismisses it.
    pub auto_dismiss: Option<Duration>,
}

pub fn present(kind: ErrorKind) -> ErrorPresentation {
    let (severity, icon) = match kind {
        ErrorKind::Validation | ErrorKind::Processing => (Severity::Error, "⚠️"),
        ErrorKind::Network => (Severity::Warning, "🌐"),
        ErrorKind::Timeout => (Severity::Caution, "⏱️"),
    };
    ErrorPresentation {
        kind,
        severity,
        icon,
        retryable: kind.is_retryable(),
        auto_dismiss: if kind.is_retryable() {
            None
        } else {
            Some(AUTO_DISMISS_AFTER)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_only_for_transient_kinds() {
        assert!(present(ErrorKind::Network).retryable);
        assert!(present(ErrorKind::Timeout).retryable);
        assert!(!present(ErrorKind::Validation).retryable);
        assert!(!present(ErrorKind::Processing).retryable);
    }

    #[test]
    fn test_auto_dismiss_policy() {
        assert_eq!(
            present(ErrorKind::Validation).auto_dismiss,
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            present(ErrorKind::Processing).auto_dismiss,
            Some(Duration::from_secs(10))
        );
        assert_eq!(present(ErrorKind::Network).auto_dismiss, None);
        assert_eq!(present(ErrorKind::Timeout).auto_dismiss, None);
    }

    #[test]
    fn test_severity_and_icon() {
        assert_eq!(present(ErrorKind::Network).icon, "🌐");
        assert_eq!(present(ErrorKind::Timeout).severity, Severity::Caution);
        assert_eq!(present(ErrorKind::Processing).severity, Severity::Error);
    }

    #[test]
    fn test_failure_display() {
        let failure = ServiceFailure::of_kind(ErrorKind::Timeout);
        assert_eq!(
            failure.to_string(),
            "timeout error: Processing timed out. The document may be too large or complex."
        );
    }
}
