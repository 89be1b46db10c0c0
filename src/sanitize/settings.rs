//! Settings sanitizer: reconcile an untrusted submission with the previously
//! persisted settings document.
//!
//! Never fails. Anything malformed falls back field by field to `previous`, so
//! the result is always a complete, valid document.

use super::text::{normalize_slug, sanitize_rich_text, sanitize_text};
use crate::i18n::LanguageRegistry;
use crate::model::{BadgePosition, DisplayConfig, LanguageContent, Section, SettingsDocument};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Key that turns a submission into a language removal.
pub const REMOVE_LANGUAGE_KEY: &str = "remove_language";

/// One section as submitted, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SectionInput {
    slug: Option<String>,
    notice_text: Option<String>,
    title: Option<String>,
    body: Option<String>,
}

/// Scalar form value as text. Objects, arrays and null carry no text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Checkbox semantics: the flag is set when the key is present. `null` and
/// JSON `false` count as absent.
fn presence_flag(config: &Map<String, Value>, key: &str) -> bool {
    !matches!(
        config.get(key),
        None | Some(Value::Null) | Some(Value::Bool(false))
    )
}

pub fn sanitize_settings(
    raw: &Value,
    previous: &SettingsDocument,
    registry: &LanguageRegistry,
) -> SettingsDocument {
    let Value::Object(input) = raw else {
        debug!("Settings submission is not an object, keeping previous document");
        return previous.clone();
    };

    if let Some(marker) = input.get(REMOVE_LANGUAGE_KEY) {
        let code = scalar_text(marker)
            .map(|c| sanitize_text(&c))
            .unwrap_or_default();
        return match registry.remove(previous, &code) {
            Ok(next) => next,
            Err(e) => {
                warn!("Language removal rejected: {}", e);
                previous.clone()
            }
        };
    }

    let mut config = match input.get("config") {
        Some(Value::Object(raw_config)) => reconcile_config(raw_config, &previous.config),
        _ => previous.config.clone(),
    };

    let mut content = previous.content.clone();
    if let Some(Value::Object(languages)) = input.get("content") {
        for (code, bundle) in languages {
            let Some(prev_bundle) = previous.content.get(code) else {
                warn!("Ignoring content for unknown language '{}'", code);
                continue;
            };
            let Value::Object(bundle) = bundle else {
                warn!("Ignoring malformed content for language '{}'", code);
                continue;
            };
            content.insert(code.clone(), reconcile_language(bundle, prev_bundle));
        }
    }

    if !content.contains_key(&config.language) {
        config.language = if content.contains_key(&previous.config.language) {
            previous.config.language.clone()
        } else {
            content.keys().next().cloned().unwrap_or_default()
        };
    }

    SettingsDocument { config, content }
}

fn reconcile_config(raw: &Map<String, Value>, previous: &DisplayConfig) -> DisplayConfig {
    let language = raw
        .get("language")
        .and_then(scalar_text)
        .map(|l| sanitize_text(&l))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| previous.language.clone());

    let badge_position = raw
        .get("badge_position")
        .and_then(scalar_text)
        .and_then(|p| BadgePosition::from_str_opt(&sanitize_text(&p)))
        .unwrap_or(previous.badge_position);

    DisplayConfig {
        language,
        support: presence_flag(raw, "support"),
        show_badge: presence_flag(raw, "show_badge"),
        badge_position,
    }
}

fn reconcile_language(raw: &Map<String, Value>, previous: &LanguageContent) -> LanguageContent {
    let text_field = |key: &str, fallback: &str| {
        raw.get(key)
            .and_then(scalar_text)
            .map(|v| sanitize_text(&v))
            .unwrap_or_else(|| fallback.to_string())
    };

    let body = raw
        .get("body")
        .and_then(scalar_text)
        .map(|v| sanitize_rich_text(&v))
        .unwrap_or_else(|| previous.body.clone());

    let sections = raw
        .get("sections")
        .map(|s| build_sections(decode_sections(s, &previous.sections)))
        .unwrap_or_default();

    LanguageContent {
        header: text_field("header", &previous.header),
        title: text_field("title", &previous.title),
        body,
        sections_header: text_field("sections_header", &previous.sections_header),
        sections,
    }
}

/// Accepts a list of section records, or the legacy form encoding of four
/// parallel arrays (`slug`, `notice_text`, `title`, `body`) indexed together.
/// A column missing from the form encoding is taken from `previous` row by
/// row.
fn decode_sections(raw: &Value, previous: &[Section]) -> Vec<SectionInput> {
    match raw {
        Value::Array(records) => records
            .iter()
            .filter_map(Value::as_object)
            .map(|record| SectionInput {
                slug: record.get("slug").and_then(scalar_text),
                notice_text: record.get("notice_text").and_then(scalar_text),
                title: record.get("title").and_then(scalar_text),
                body: record.get("body").and_then(scalar_text),
            })
            .collect(),
        Value::Object(columns) => {
            let column = |key: &str, index: usize| match columns.get(key) {
                Some(values) => values
                    .as_array()
                    .and_then(|values| values.get(index))
                    .and_then(scalar_text),
                None => previous.get(index).map(|section| match key {
                    "slug" => section.slug.clone(),
                    "notice_text" => section.notice_text.clone(),
                    "title" => section.title.clone(),
                    _ => section.body.clone(),
                }),
            };
            let rows = match columns.get("title") {
                Some(titles) => titles.as_array().map(Vec::len).unwrap_or(0),
                None => previous.len(),
            };
            (0..rows)
                .map(|i| SectionInput {
                    slug: column("slug", i),
                    notice_text: column("notice_text", i),
                    title: column("title", i),
                    body: column("body", i),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Keep sections that have a title and a body; an empty title is how the
/// admin form removes a row.
fn build_sections(inputs: Vec<SectionInput>) -> Vec<Section> {
    inputs
        .into_iter()
        .filter_map(|input| {
            let title = sanitize_text(input.title.as_deref().unwrap_or_default());
            let body = input.body?;
            if title.is_empty() {
                return None;
            }
            Some(Section {
                slug: normalize_slug(input.slug.as_deref().unwrap_or_default()),
                notice_text: sanitize_text(input.notice_text.as_deref().unwrap_or_default()),
                title,
                body: sanitize_rich_text(&body),
            })
        })
        .collect()
}
