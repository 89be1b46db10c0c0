//! Default configuration store.
//!
//! Holds the canonical defaults (settings document, style document and the
//! list of languages an operator may enable). Loaded once at startup and
//! shared read-only afterwards; callers receive it through `AppState` rather
//! than a global.

use crate::model::{SettingsDocument, StyleDocument};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Defaults compiled into the binary.
const EMBEDDED_DEFAULTS: &str = include_str!("defaults.json");

/// Top-level sections of the defaults resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSection {
    OptionsDefault,
    StylesDefault,
    AvailableLanguages,
}

impl DefaultSection {
    pub fn key(&self) -> &'static str {
        match self {
            DefaultSection::OptionsDefault => "options_default",
            DefaultSection::StylesDefault => "styles_default",
            DefaultSection::AvailableLanguages => "available_languages",
        }
    }
}

#[derive(Debug, Error)]
pub enum DefaultsError {
    #[error("defaults resource not readable at {path}: {source}")]
    Missing {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("defaults resource is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("defaults resource is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct DefaultsFile {
    options_default: SettingsDocument,
    styles_default: StyleDocument,
    available_languages: IndexMap<String, String>,
}

/// Immutable lookup table over the defaults resource.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    raw: Value,
    options_default: SettingsDocument,
    styles_default: StyleDocument,
    available_languages: IndexMap<String, String>,
}

impl ConfigStore {
    /// Load the defaults embedded in the binary.
    pub fn embedded() -> Result<Self, DefaultsError> {
        Self::from_json(EMBEDDED_DEFAULTS)
    }

    /// Load defaults from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DefaultsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DefaultsError::Missing {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, DefaultsError> {
        let raw: Value = serde_json::from_str(text)?;
        let parsed: DefaultsFile = serde_json::from_value(raw.clone())?;

        if parsed.options_default.content.is_empty() {
            return Err(DefaultsError::Invalid(
                "options_default.content must contain at least one language".to_string(),
            ));
        }
        if !parsed
            .options_default
            .has_language(&parsed.options_default.config.language)
        {
            return Err(DefaultsError::Invalid(format!(
                "default language '{}' has no content",
                parsed.options_default.config.language
            )));
        }
        if parsed.available_languages.is_empty() {
            return Err(DefaultsError::Invalid(
                "available_languages must not be empty".to_string(),
            ));
        }

        Ok(Self {
            raw,
            options_default: parsed.options_default,
            styles_default: parsed.styles_default,
            available_languages: parsed.available_languages,
        })
    }

    /// Raw JSON of one defaults section.
    pub fn get(&self, section: DefaultSection) -> &Value {
        // Presence of all three keys was checked by the typed parse in from_json
        &self.raw[section.key()]
    }

    pub fn options_default(&self) -> SettingsDocument {
        self.options_default.clone()
    }

    pub fn styles_default(&self) -> StyleDocument {
        self.styles_default.clone()
    }

    /// Language code -> display name, in declaration order.
    pub fn available_languages(&self) -> &IndexMap<String, String> {
        &self.available_languages
    }
}
