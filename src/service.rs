//! Analysis Service implementations
//!
//! The service turns a PDF or a URL into a [`GrantAnalysisResult`]. It is an
//! external collaborator: the real extraction happens behind an HTTP endpoint.
//! Each call resolves exactly once, either with a result or with a typed
//! [`ServiceFailure`].

use crate::errors::{ErrorKind, ServiceFailure};
use crate::model::{sample_result, GrantAnalysisResult};
use serde::Deserialize;
use std::time::Duration;

/// Payload sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    File { name: String, bytes: Vec<u8> },
    Url(String),
}

impl AnalysisRequest {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            AnalysisRequest::File { name, bytes } => format!("{} ({} bytes)", name, bytes.len()),
            AnalysisRequest::Url(url) => url.clone(),
        }
    }
}

/// Something that can analyze a grant document. Calls block until resolved.
pub trait AnalysisService: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(&self, request: &AnalysisRequest) -> Result<GrantAnalysisResult, ServiceFailure>;
}

/// Returns an empty result for every request, like the placeholder backend.
#[derive(Debug, Default)]
pub struct StubAnalysisService;

impl AnalysisService for StubAnalysisService {
    fn name(&self) -> &str {
        "stub"
    }

    fn analyze(&self, request: &AnalysisRequest) -> Result<GrantAnalysisResult, ServiceFailure> {
        log::debug!("Stub analysis of {}", request.describe());
        Ok(GrantAnalysisResult::default())
    }
}

/// Returns the demonstration grant after a fixed delay.
#[derive(Debug)]
pub struct SampleAnalysisService {
    pub delay: Duration,
}

impl SampleAnalysisService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl AnalysisService for SampleAnalysisService {
    fn name(&self) -> &str {
        "sample"
    }

    fn analyze(&self, request: &AnalysisRequest) -> Result<GrantAnalysisResult, ServiceFailure> {
        log::debug!("Sample analysis of {}", request.describe());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(sample_result())
    }
}

// ============================================================================
// HTTP service
// ============================================================================

/// Posts documents to a remote analysis endpoint.
///
/// PDFs go as multipart field `file`; URLs as JSON `{"url": ...}`. The
/// blocking client is built per call on the calling thread and must not be
/// used from inside an async runtime.
pub struct HttpAnalysisService {
    endpoint: String,
    timeout: Duration,
}

impl HttpAnalysisService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send(
        &self,
        request: &AnalysisRequest,
    ) -> Result<reqwest::blocking::Response, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        match request {
            AnalysisRequest::File { name, bytes } => {
                let part = reqwest::blocking::multipart::Part::bytes(bytes.clone())
                    .file_name(name.clone())
                    .mime_str("application/pdf")?;
                let form = reqwest::blocking::multipart::Form::new().part("file", part);
                client.post(&self.endpoint).multipart(form).send()
            }
            AnalysisRequest::Url(url) => client
                .post(&self.endpoint)
                .json(&serde_json::json!({ "url": url }))
                .send(),
        }
    }
}

impl AnalysisService for HttpAnalysisService {
    fn name(&self) -> &str {
        "http"
    }

    fn analyze(&self, request: &AnalysisRequest) -> Result<GrantAnalysisResult, ServiceFailure> {
        log::info!("POST {} <- {}", self.endpoint, request.describe());
        let response = self.send(request).map_err(|e| classify_transport_error(&e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| classify_transport_error(&e))?;
        log::debug!("Analysis endpoint answered {} ({} bytes)", status, body.len());
        parse_envelope(status, &body)
    }
}

fn classify_transport_error(err: &reqwest::Error) -> ServiceFailure {
    log::warn!("Analysis request failed: {}", err);
    if err.is_timeout() {
        ServiceFailure::of_kind(ErrorKind::Timeout)
    } else if err.is_decode() || err.is_builder() {
        ServiceFailure::of_kind(ErrorKind::Processing)
    } else {
        ServiceFailure::of_kind(ErrorKind::Network)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<GrantAnalysisResult>,
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: Option<String>,
    message: Option<String>,
}

/// Interpret an endpoint response of the form
/// `{success, message?, data?, error?: {code, message}}`.
pub fn parse_envelope(status: u16, body: &str) -> Result<GrantAnalysisResult, ServiceFailure> {
    match status {
        408 | 504 => return Err(ServiceFailure::of_kind(ErrorKind::Timeout)),
        502 | 503 => return Err(ServiceFailure::of_kind(ErrorKind::Network)),
        _ => {}
    }

    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        log::warn!("Undecodable analysis response (status {}): {}", status, e);
        ServiceFailure::processing("Unexpected response from the analysis service.")
    })?;

    if !envelope.success {
        let (code, message) = envelope
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or((None, None));
        let kind = match code.as_deref() {
            Some("TIMEOUT") => ErrorKind::Timeout,
            _ => ErrorKind::Processing,
        };
        return Err(match message.filter(|m| !m.trim().is_empty()) {
            Some(message) => ServiceFailure::new(kind, message),
            None => ServiceFailure::of_kind(kind),
        });
    }

    envelope
        .data
        .ok_or_else(|| ServiceFailure::of_kind(ErrorKind::Processing))
}
