use std::{fs, io, path::Path, time::Duration};

use client_core::{ClientConfig, DEFAULT_ENDPOINT_URL, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use shared::domain::ValidationPolicy;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "safeurl.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("endpoint url '{url}' is not usable: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub endpoint_url: String,
    pub request_timeout_secs: u64,
    pub validation_policy: ValidationPolicy,
    pub submit_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8501".into(),
            endpoint_url: DEFAULT_ENDPOINT_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            validation_policy: ValidationPolicy::default(),
            submit_delay_ms: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    endpoint_url: Option<String>,
    request_timeout_secs: Option<u64>,
    validation_policy: Option<ValidationPolicy>,
    enforce_shape_validation: Option<bool>,
    submit_delay_ms: Option<u64>,
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint_url: self.endpoint_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            submit_delay: Duration::from_millis(self.submit_delay_ms),
        }
    }
}

/// Defaults, then `safeurl.toml` (or `$SAFEURL_CONFIG`) if present, then
/// environment overrides. The endpoint is checked last.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();

    let path = std::env::var("SAFEURL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    if Path::new(&path).exists() {
        let raw = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        apply_file(&mut settings, &raw)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    validate_endpoint(&settings.endpoint_url)?;
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> Result<(), SettingsError> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.endpoint_url {
        settings.endpoint_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = nonzero_timeout("request_timeout_secs", v)?;
    }
    if let Some(v) = file_cfg.enforce_shape_validation {
        settings.validation_policy = ValidationPolicy::from_enforce_flag(v);
    }
    // An explicit policy wins over the legacy flag.
    if let Some(v) = file_cfg.validation_policy {
        settings.validation_policy = v;
    }
    if let Some(v) = file_cfg.submit_delay_ms {
        settings.submit_delay_ms = v;
    }
    Ok(())
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), SettingsError> {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("SAFEURL_ENDPOINT") {
        settings.endpoint_url = v;
    }
    if let Some(v) = lookup("APP__ENDPOINT_URL") {
        settings.endpoint_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        let secs = parse_number("APP__REQUEST_TIMEOUT_SECS", v)?;
        settings.request_timeout_secs = nonzero_timeout("APP__REQUEST_TIMEOUT_SECS", secs)?;
    }
    if let Some(v) = lookup("APP__SUBMIT_DELAY_MS") {
        settings.submit_delay_ms = parse_number("APP__SUBMIT_DELAY_MS", v)?;
    }

    if let Some(v) = lookup("APP__ENFORCE_SHAPE_VALIDATION") {
        let enforce = v
            .trim()
            .parse::<bool>()
            .map_err(|_| SettingsError::InvalidValue {
                key: "APP__ENFORCE_SHAPE_VALIDATION",
                value: v.clone(),
            })?;
        settings.validation_policy = ValidationPolicy::from_enforce_flag(enforce);
    }
    if let Some(v) = lookup("APP__VALIDATION_POLICY") {
        settings.validation_policy = v.parse().map_err(|_| SettingsError::InvalidValue {
            key: "APP__VALIDATION_POLICY",
            value: v.clone(),
        })?;
    }

    Ok(())
}

fn parse_number(key: &'static str, value: String) -> Result<u64, SettingsError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SettingsError::InvalidValue { key, value })
}

/// A zero timeout expires before the request is sent, failing every submission.
fn nonzero_timeout(key: &'static str, secs: u64) -> Result<u64, SettingsError> {
    if secs == 0 {
        return Err(SettingsError::InvalidValue {
            key,
            value: secs.to_string(),
        });
    }
    Ok(secs)
}

pub fn validate_endpoint(raw: &str) -> Result<Url, SettingsError> {
    let invalid = |reason: String| SettingsError::InvalidEndpoint {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(parsed)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
