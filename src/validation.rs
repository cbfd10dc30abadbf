//! Input validation for grant documents
//!
//! A submission is either a PDF file or a public web URL, never both. The
//! checks here are pure: they look only at the candidate values and never
//! touch the file system or the network.

use regex::Regex;
use std::fmt;
use std::path::PathBuf;

/// Largest accepted PDF, in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const PDF_MIME_TYPE: &str = "application/pdf";

lazy_static::lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&/=]*)$"
    )
    .unwrap();
}

/// Result of checking one candidate. An invalid outcome always carries the
/// message to show the user; a valid one never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    fn invalid(message: impl Into<String>) -> Self {
        ValidationOutcome::Invalid(message.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(message) => Some(message),
        }
    }
}

/// A file the user picked, described by metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    /// MIME type reported by the picker, if it reported one.
    pub mime_type: Option<String>,
    /// Where the bytes live; read only when the request is dispatched.
    pub path: Option<PathBuf>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: None,
            path: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// The one source a submission is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(FileCandidate),
    Url(String),
}

/// Which kind of input the user is currently providing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Pdf,
    Url,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Pdf => write!(f, "PDF"),
            InputMode::Url => write!(f, "URL"),
        }
    }
}

/// Everything the user has staged so far, across both input modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedInput {
    pub mode: InputMode,
    pub file: Option<FileCandidate>,
    pub url: String,
}

impl StagedInput {
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }

    /// The staged input belonging to the active mode, if any.
    pub fn active_source(&self) -> Option<InputSource> {
        match self.mode {
            InputMode::Pdf => self.file.clone().map(InputSource::File),
            InputMode::Url if self.has_url() => Some(InputSource::Url(self.url.clone())),
            InputMode::Url => None,
        }
    }

    /// Label for the submit affordance when idle.
    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            InputMode::Pdf if self.has_file() => "Analyze PDF",
            InputMode::Pdf => "Select PDF to Analyze",
            InputMode::Url if self.has_url() => "Analyze URL",
            InputMode::Url => "Enter URL to Analyze",
        }
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.url.clear();
    }
}

/// Check a picked file. The first failing rule wins.
pub fn validate_file(candidate: &FileCandidate) -> ValidationOutcome {
    if !candidate.name.to_lowercase().ends_with(".pdf") {
        return ValidationOutcome::invalid(
            "Please upload a PDF file. Only PDF files are supported.",
        );
    }

    if let Some(mime) = candidate.mime_type.as_deref().filter(|m| !m.is_empty()) {
        if mime != PDF_MIME_TYPE {
            return ValidationOutcome::invalid(
                "Invalid file type. Please upload a valid PDF file.",
            );
        }
    }

    if candidate.size_bytes > MAX_FILE_SIZE {
        return ValidationOutcome::invalid(format!(
            "File size must be under 10MB. Your file is {}.",
            format_file_size(candidate.size_bytes)
        ));
    }

    if candidate.size_bytes == 0 {
        return ValidationOutcome::invalid(
            "The selected file appears to be empty. Please choose a valid PDF file.",
        );
    }

    ValidationOutcome::Valid
}

/// Check URL text for a public http(s) address.
///
/// Any occurrence of `localhost` or `127.0.0.1` rejects the URL, including in
/// the path or query.
pub fn validate_url(text: &str) -> ValidationOutcome {
    if !URL_PATTERN.is_match(text) {
        return ValidationOutcome::invalid(
            "Please enter a valid web URL (e.g., https://example.com/grant-guidelines)",
        );
    }

    if text.contains("localhost") || text.contains("127.0.0.1") {
        return ValidationOutcome::invalid(
            "Local URLs are not supported. Please provide a public web URL.",
        );
    }

    ValidationOutcome::Valid
}

/// Require exactly one staged input, then validate it for the active mode.
pub fn validate_inputs(staged: &StagedInput) -> ValidationOutcome {
    match (staged.has_file(), staged.has_url()) {
        (true, true) => {
            ValidationOutcome::invalid("Please choose either PDF upload or URL input, not both.")
        }
        (false, false) => {
            ValidationOutcome::invalid("Please provide either a PDF file or a URL to analyze.")
        }
        _ => match staged.active_source() {
            Some(InputSource::File(candidate)) => validate_file(&candidate),
            Some(InputSource::Url(text)) => validate_url(&text),
            None => ValidationOutcome::invalid(format!(
                "The staged input does not match the selected {} mode.",
                staged.mode
            )),
        },
    }
}

/// Human-readable size: `0 Bytes`, `1.5 KB`, `11 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(size: u64) -> FileCandidate {
        FileCandidate::new("grant.pdf", size).with_mime_type(PDF_MIME_TYPE)
    }

    #[test]
    fn test_valid_pdf() {
        assert!(validate_file(&pdf(2048)).is_valid());
        // Extension match ignores case and a missing MIME type is fine
        assert!(validate_file(&FileCandidate::new("GRANT.PDF", 10)).is_valid());
    }

    #[test]
    fn test_wrong_extension() {
        let outcome = validate_file(&FileCandidate::new("grant.txt", 100).with_mime_type("text/plain"));
        assert_eq!(
            outcome.message(),
            Some("Please upload a PDF file. Only PDF files are supported.")
        );
    }

    #[test]
    fn test_wrong_mime_type() {
        let outcome = validate_file(&FileCandidate::new("grant.pdf", 100).with_mime_type("text/plain"));
        assert_eq!(
            outcome.message(),
            Some("Invalid file type. Please upload a valid PDF file.")
        );
    }

    #[test]
    fn test_oversize_reports_actual_size() {
        let outcome = validate_file(&pdf(11 * 1024 * 1024));
        assert_eq!(
            outcome.message(),
            Some("File size must be under 10MB. Your file is 11 MB.")
        );
        assert!(validate_file(&pdf(MAX_FILE_SIZE)).is_valid());
    }

    #[test]
    fn test_empty_file() {
        let outcome = validate_file(&pdf(0));
        assert!(outcome.message().unwrap().contains("appears to be empty"));
    }

    #[test]
    fn test_extension_checked_before_size() {
        let outcome = validate_file(&FileCandidate::new("grant.doc", 0));
        assert!(outcome.message().unwrap().contains("Only PDF files"));
    }

    #[test]
    fn test_urls() {
        assert!(validate_url("https://example.com/grant-guidelines").is_valid());
        assert!(validate_url("http://example.com/grants").is_valid());
        assert!(validate_url("https://grants.example.com/guidelines").is_valid());
        assert!(validate_url("https://www.example.org/a?b=c&d=e").is_valid());
        assert!(!validate_url("not-a-url").is_valid());
        assert!(!validate_url("ftp://example.com/file").is_valid());
        assert!(!validate_url("http://localhost:3000/grants").is_valid());
    }

    #[test]
    fn test_local_urls_rejected_anywhere() {
        let outcome = validate_url("http://127.0.0.1/grants");
        assert_eq!(
            outcome.message(),
            Some("Local URLs are not supported. Please provide a public web URL.")
        );
        // Substring match also catches public URLs that merely mention it
        assert!(!validate_url("https://example.com/localhost-grants").is_valid());
    }

    #[test]
    fn test_inputs_both_and_neither() {
        let mut staged = StagedInput {
            mode: InputMode::Pdf,
            file: Some(pdf(100)),
            url: "https://example.com".to_string(),
        };
        assert!(validate_inputs(&staged).message().unwrap().contains("not both"));

        staged.clear();
        assert!(validate_inputs(&staged)
            .message()
            .unwrap()
            .contains("provide either"));
    }

    #[test]
    fn test_inputs_single_source() {
        let staged = StagedInput {
            mode: InputMode::Pdf,
            file: Some(pdf(100)),
            url: String::new(),
        };
        assert!(validate_inputs(&staged).is_valid());

        let staged = StagedInput {
            mode: InputMode::Url,
            file: None,
            url: "https://example.com".to_string(),
        };
        assert!(validate_inputs(&staged).is_valid());
    }

    #[test]
    fn test_inputs_mode_mismatch() {
        let staged = StagedInput {
            mode: InputMode::Url,
            file: Some(pdf(100)),
            url: String::new(),
        };
        assert!(!validate_inputs(&staged).is_valid());
        assert_eq!(staged.active_source(), None);
    }

    #[test]
    fn test_submit_label() {
        let mut staged = StagedInput::default();
        assert_eq!(staged.submit_label(), "Select PDF to Analyze");
        staged.file = Some(pdf(1));
        assert_eq!(staged.submit_label(), "Analyze PDF");
        staged.mode = InputMode::Url;
        assert_eq!(staged.submit_label(), "Enter URL to Analyze");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(11 * 1024 * 1024), "11 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
