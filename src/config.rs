//! Persisted settings
//!
//! Stored as `key=value` lines in `~/.grant-analyzer.conf`. A missing file or
//! unknown keys are not errors; bad values fall back to their defaults.

use crate::service::{
    AnalysisService, HttpAnalysisService, SampleAnalysisService, StubAnalysisService,
};
use crate::state::AnalyzerConfig;
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const CONFIG_FILE_NAME: &str = ".grant-analyzer.conf";

/// Which Analysis Service implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceKind {
    Http,
    #[default]
    Sample,
    Stub,
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ServiceKind::Http),
            "sample" => Ok(ServiceKind::Sample),
            "stub" => Ok(ServiceKind::Stub),
            other => Err(format!(
                "unknown service '{}' (expected http, sample or stub)",
                other
            )),
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::Http => "http",
            ServiceKind::Sample => "sample",
            ServiceKind::Stub => "stub",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service: ServiceKind,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub sample_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceKind::default(),
            endpoint: None,
            timeout_secs: 60,
            sample_delay_ms: 6000,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            processing_timeout: self.timeout(),
        }
    }

    /// Construct the configured service. The HTTP service needs an endpoint.
    pub fn build_service(&self) -> Result<Arc<dyn AnalysisService>> {
        let service: Arc<dyn AnalysisService> = match self.service {
            ServiceKind::Stub => Arc::new(StubAnalysisService),
            ServiceKind::Sample => Arc::new(SampleAnalysisService::new(Duration::from_millis(
                self.sample_delay_ms,
            ))),
            ServiceKind::Http => {
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or_else(|| anyhow!("The http service requires an endpoint URL"))?;
                Arc::new(HttpAnalysisService::new(endpoint, self.timeout()))
            }
        };
        log::debug!("Using {} analysis service", service.name());
        Ok(service)
    }

    pub fn to_config_string(&self) -> String {
        let mut content = format!("service={}\n", self.service);
        if let Some(endpoint) = &self.endpoint {
            content.push_str(&format!("endpoint={}\n", endpoint));
        }
        content.push_str(&format!(
            "timeout_secs={}\nsample_delay_ms={}\n",
            self.timeout_secs, self.sample_delay_ms
        ));
        content
    }
}

fn parse_or_default<T: FromStr>(key: &str, value: &str, default: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            log::warn!("Ignoring invalid {} value '{}'", key, value);
            default
        }
    }
}

/// Parse settings text. Never fails.
pub fn parse_settings(content: &str) -> Settings {
    let defaults = Settings::default();
    let mut settings = Settings::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "service" => {
                    settings.service = parse_or_default("service", value, defaults.service)
                }
                "endpoint" => {
                    settings.endpoint = Some(value.to_string()).filter(|v| !v.is_empty())
                }
                "timeout_secs" => {
                    settings.timeout_secs =
                        parse_or_default("timeout_secs", value, defaults.timeout_secs)
                }
                "sample_delay_ms" => {
                    settings.sample_delay_ms =
                        parse_or_default("sample_delay_ms", value, defaults.sample_delay_ms)
                }
                _ => {}
            }
        }
    }

    settings
}

pub fn config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

/// Load settings from `path`; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    Ok(parse_settings(&content))
}

/// Load settings from the home directory, falling back to defaults.
pub fn load_settings() -> Settings {
    let Some(path) = config_path() else {
        return Settings::default();
    };
    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("{:#}", e);
            Settings::default()
        }
    }
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    std::fs::write(path, settings.to_config_string())
        .with_context(|| format!("Failed to write config: {}", path.display()))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = config_path().ok_or_else(|| anyhow!("HOME is not set"))?;
    save_settings_to(&path, settings)
}
