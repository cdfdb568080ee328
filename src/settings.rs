//! Settings for locating and polling the models folder.
//!
//! Settings come from an optional JSON file with every field defaulted, then
//! environment overrides: `DTDL_MODELS_ROOT`, `DTDL_POLL_INTERVAL_MS` and
//! `DTDL_RELOAD_INTERVAL_MS`. The environment always wins over the file.

use crate::sync::SyncConfig;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ROOT_ENV: &str = "DTDL_MODELS_ROOT";
pub const POLL_INTERVAL_ENV: &str = "DTDL_POLL_INTERVAL_MS";
pub const RELOAD_INTERVAL_ENV: &str = "DTDL_RELOAD_INTERVAL_MS";

const DEFAULT_INTERVAL_MS: u64 = 2000;
const DEFAULT_EXTENSION: &str = "json";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root location of the interface documents.
    pub models_root: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub reload_interval_ms: u64,
    /// Tracked file extension; an empty string tracks every file.
    pub extension: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_root: None,
            poll_interval_ms: DEFAULT_INTERVAL_MS,
            reload_interval_ms: DEFAULT_INTERVAL_MS,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    ///
    /// A relative `models_root` is resolved against the settings file's
    /// directory so settings files can travel with their models.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&data)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        if let (Some(root), Some(base)) = (settings.models_root.as_mut(), path.parent()) {
            if root.is_relative() {
                *root = base.join(&*root);
            }
        }
        Ok(settings)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Apply environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup(ROOT_ENV).filter(|value| !value.trim().is_empty()) {
            self.models_root = Some(PathBuf::from(root.trim()));
        }
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            self.poll_interval_ms = parse_millis(POLL_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(RELOAD_INTERVAL_ENV) {
            self.reload_interval_ms = parse_millis(RELOAD_INTERVAL_ENV, &raw)?;
        }
        Ok(())
    }

    /// The configured root; there is no implicit fallback location.
    pub fn models_root(&self) -> Result<&Path> {
        match self.models_root.as_deref() {
            Some(root) if !root.as_os_str().is_empty() => Ok(root),
            _ => bail!("No models root configured. Set {ROOT_ENV} or 'models_root' in the settings file."),
        }
    }

    pub fn sync_config(&self) -> Result<SyncConfig> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        Ok(SyncConfig {
            root: self.models_root()?.to_path_buf(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            reload_interval: Duration::from_millis(self.reload_interval_ms),
            extension: Some(self.extension.trim_start_matches('.'))
                .filter(|ext| !ext.is_empty())
                .map(str::to_string),
        })
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a whole number of milliseconds, got '{raw}'"))
}
