//! # Configuration
//!
//! Environment-provided settings plus a persisted base URL override.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CANVASBOX_CHAPTERS_BASE_URL` | `/chapters` |
//! | `CANVASBOX_ORIGIN` | `http://localhost` |
//! | `CANVASBOX_ENABLE_CHAPTERS_BASE_URL_EDITOR` | disabled |
//! | `CANVASBOX_ENABLE_CHAPTERS_SSE_LIVE_UPDATE` | disabled |
//! | `CANVASBOX_STATE_DIR` | `<config dir>/canvasbox` |
//!
//! Flags are enabled only by the exact value `true`. The override file is
//! read and written only while the base URL editor is enabled.

use canvasbox_core::ContentLocator;
use canvasbox_core::locator::{DEFAULT_BASE_URL, DEFAULT_ORIGIN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const ENV_BASE_URL: &str = "CANVASBOX_CHAPTERS_BASE_URL";
pub const ENV_ORIGIN: &str = "CANVASBOX_ORIGIN";
pub const ENV_ENABLE_BASE_URL_EDITOR: &str = "CANVASBOX_ENABLE_CHAPTERS_BASE_URL_EDITOR";
pub const ENV_ENABLE_LIVE_RELOAD: &str = "CANVASBOX_ENABLE_CHAPTERS_SSE_LIVE_UPDATE";
pub const ENV_STATE_DIR: &str = "CANVASBOX_STATE_DIR";

/// File holding the persisted override inside the state directory.
pub const OVERRIDE_FILENAME: &str = "base_url.json";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid page origin '{value}': {source}")]
    InvalidOrigin {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("override file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("override file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL from the environment, before any persisted override.
    pub base_url: String,
    pub origin: Url,
    pub enable_base_url_editor: bool,
    pub enable_live_reload: bool,
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let origin_value = lookup(ENV_ORIGIN).unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let origin = parse_origin(&origin_value)?;

        Ok(Self {
            base_url: lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            origin,
            enable_base_url_editor: flag(lookup(ENV_ENABLE_BASE_URL_EDITOR)),
            enable_live_reload: flag(lookup(ENV_ENABLE_LIVE_RELOAD)),
            state_dir: lookup(ENV_STATE_DIR)
                .map(PathBuf::from)
                .or_else(|| dirs::config_dir().map(|dir| dir.join("canvasbox"))),
        })
    }

    /// Replace the page origin.
    pub fn set_origin(&mut self, value: &str) -> Result<(), ConfigError> {
        self.origin = parse_origin(value)?;
        Ok(())
    }

    /// The persisted override store, if a state directory is known.
    #[must_use]
    pub fn base_url_override(&self) -> Option<BaseUrlOverride> {
        self.state_dir
            .as_deref()
            .map(|dir| BaseUrlOverride::new(dir, self.enable_base_url_editor))
    }

    /// Base URL after applying the persisted override.
    pub fn effective_base_url(&self) -> Result<String, ConfigError> {
        if let Some(store) = self.base_url_override() {
            if let Some(url) = store.get()? {
                return Ok(url);
            }
        }
        Ok(self.base_url.clone())
    }

    /// Locator for the effective base URL.
    pub fn locator(&self) -> Result<ContentLocator, ConfigError> {
        Ok(ContentLocator::new(
            self.effective_base_url()?,
            self.origin.clone(),
        ))
    }
}

fn flag(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

fn parse_origin(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidOrigin {
        value: value.to_string(),
        source,
    })
}

// =============================================================================
// PERSISTED OVERRIDE
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct OverrideFile {
    chapters_base_url: String,
}

/// Base URL override persisted across runs.
///
/// Every operation is inert while the editor is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlOverride {
    path: PathBuf,
    enabled: bool,
}

impl BaseUrlOverride {
    #[must_use]
    pub fn new(state_dir: &Path, enabled: bool) -> Self {
        Self {
            path: state_dir.join(OVERRIDE_FILENAME),
            enabled,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The stored base URL, if any.
    pub fn get(&self) -> Result<Option<String>, ConfigError> {
        if !self.enabled || !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: OverrideFile = serde_json::from_str(&content)?;
        Ok(Some(file.chapters_base_url))
    }

    /// Persist `url`. Returns `false` when the editor is disabled.
    pub fn set(&self, url: &str) -> Result<bool, ConfigError> {
        if !self.enabled {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OverrideFile {
            chapters_base_url: url.to_string(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!(path = %self.path.display(), %url, "base URL override saved");
        Ok(true)
    }

    /// Remove the stored override. Returns `false` when the editor is disabled.
    pub fn reset(&self) -> Result<bool, ConfigError> {
        if !self.enabled {
            return Ok(false);
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        tracing::info!(path = %self.path.display(), "base URL override removed");
        Ok(true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
