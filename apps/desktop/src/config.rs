use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::ClientConfig;
use serde::Deserialize;
use shared::protocol::{DEFAULT_UPLOAD_FIELD, MAX_UPLOAD_BYTES};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "ocr_review.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub completion_delay_ms: u64,
    pub process_timeout_secs: u64,
    pub progress_timeout_secs: u64,
    pub upload_field: String,
    /// `None` or 0 turns the client-side size check off.
    pub max_upload_bytes: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            poll_interval_ms: 1000,
            completion_delay_ms: 1000,
            process_timeout_secs: 300,
            progress_timeout_secs: 10,
            upload_field: DEFAULT_UPLOAD_FIELD.into(),
            max_upload_bytes: Some(MAX_UPLOAD_BYTES),
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            completion_delay: Duration::from_millis(self.completion_delay_ms),
            process_timeout: Duration::from_secs(self.process_timeout_secs),
            progress_timeout: Duration::from_secs(self.progress_timeout_secs),
            upload_field: self.upload_field.clone(),
            max_upload_bytes: self.max_upload_bytes.filter(|limit| *limit > 0),
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// File values first, then environment overrides read through `lookup`.
///
/// A missing default file is not an error; a missing explicit one is.
pub fn load_settings_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_settings_file(&default_path)?
            } else {
                Settings::default()
            }
        }
    };

    apply_env_overrides(&mut settings, lookup);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid settings file {}", path.display()))
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("OCR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = parse_env(&lookup, "APP__POLL_INTERVAL_MS") {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = parse_env(&lookup, "APP__COMPLETION_DELAY_MS") {
        settings.completion_delay_ms = v;
    }
    if let Some(v) = parse_env(&lookup, "APP__PROCESS_TIMEOUT_SECS") {
        settings.process_timeout_secs = v;
    }
    if let Some(v) = parse_env(&lookup, "APP__PROGRESS_TIMEOUT_SECS") {
        settings.progress_timeout_secs = v;
    }

    if let Some(v) = lookup("APP__UPLOAD_FIELD") {
        if !v.trim().is_empty() {
            settings.upload_field = v.trim().to_string();
        }
    }

    // 0 disables the limit.
    if let Some(v) = parse_env(&lookup, "APP__MAX_UPLOAD_BYTES") {
        settings.max_upload_bytes = (v > 0).then_some(v);
    }
}

fn parse_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "config: ignoring invalid numeric override");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
