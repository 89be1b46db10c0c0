//! Front-end payload: the JSON handed to the widget, its bootstrap script and
//! the CSS custom properties derived from the style document.

use crate::model::{BadgePosition, LanguageContent, Section, SettingsDocument, StyleDocument};
use crate::sanitize::{sanitize_css_length, sanitize_hex_color};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static PARAGRAPH_BREAK_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub language: String,
    pub support: bool,
    pub show_badge: bool,
    pub badge_position: BadgePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<WidgetSection>>,
}

/// Everything the widget needs to render the badge and the modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetPayload {
    pub config: WidgetConfig,
    pub content: IndexMap<String, WidgetContent>,
}

impl WidgetPayload {
    /// Same payload with a different language selected for display.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty_body(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| autop(value))
}

fn project_section(section: &Section) -> WidgetSection {
    WidgetSection {
        slug: non_empty(&section.slug),
        notice_text: non_empty(&section.notice_text),
        title: non_empty(&section.title),
        body: non_empty_body(&section.body),
    }
}

fn project_content(content: &LanguageContent) -> WidgetContent {
    WidgetContent {
        header: non_empty(&content.header),
        title: non_empty(&content.title),
        body: non_empty_body(&content.body),
        sections_header: non_empty(&content.sections_header),
        sections: (!content.sections.is_empty())
            .then(|| content.sections.iter().map(project_section).collect()),
    }
}

/// Project a settings document onto the widget payload. Empty fields are
/// omitted and bodies are paragraph-wrapped.
pub fn build_payload(settings: &SettingsDocument) -> WidgetPayload {
    WidgetPayload {
        config: WidgetConfig {
            language: settings.config.language.clone(),
            support: settings.config.support,
            show_badge: settings.config.show_badge,
            badge_position: settings.config.badge_position,
        },
        content: settings
            .content
            .iter()
            .map(|(code, content)| (code.clone(), project_content(content)))
            .collect(),
    }
}

/// Wrap newline-delimited text in paragraphs.
///
/// Blocks separated by a blank line become `<p>` elements and single newlines
/// inside them become `<br />`. Blocks that already open with a block-level
/// tag are kept as they are.
pub fn autop(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let breaks = PARAGRAPH_BREAK_REGEX.get_or_init(|| Regex::new(r"\n[ \t]*\n").unwrap());
    let block_tag = BLOCK_TAG_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^<(p|ul|ol|li|div|h[1-6]|blockquote|table|pre)[\s>/]").unwrap()
    });

    let mut out = String::new();
    for block in breaks.split(normalized.trim()) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if block_tag.is_match(block) {
            out.push_str(block);
        } else {
            out.push_str("<p>");
            out.push_str(&block.replace('\n', "<br />\n"));
            out.push_str("</p>");
        }
        out.push('\n');
    }
    out
}

/// `<script>` element that boots the widget with `payload`.
pub fn widget_script(payload: &WidgetPayload) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?
        .replace("</", "<\\/")
        .replace("<!--", "<\\!--");
    Ok(format!(
        "<script>\ndocument.addEventListener('DOMContentLoaded', function() {{\n    new AGCN({json});\n}});\n</script>\n"
    ))
}

/// CSS custom properties for the widget. Values that are not valid colors or
/// lengths are skipped.
pub fn style_variables(style: &StyleDocument) -> String {
    let mut css = String::from(".agcn-variables {");
    for (slot, value) in &style.colors {
        if let Some(color) = sanitize_hex_color(value) {
            css.push_str(&format!("--{}: {} !important;", slot.key(), color));
        }
    }
    let offset = sanitize_css_length(&style.badge_offset).unwrap_or_else(|| "0rem".to_string());
    css.push_str(&format!("--badge-offset: {} !important;", offset));
    css.push('}');
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::ConfigStore;
    use crate::model::ColorSlot;

    fn default_settings() -> SettingsDocument {
        ConfigStore::embedded().unwrap().options_default()
    }

    // ==================== build_payload Tests ====================

    #[test]
    fn test_default_payload_round_trip() {
        let payload = build_payload(&default_settings());
        let en = &payload.content["en"];
        assert!(en.header.as_deref().is_some_and(|h| !h.is_empty()));
        assert!(en.title.as_deref().is_some_and(|t| !t.is_empty()));
        assert!(en.body.as_deref().is_some_and(|b| b.starts_with("<p>")));
        assert!(en.sections_header.is_some());

        let sections = en.sections.as_ref().expect("sections present");
        let slugs: Vec<_> = sections.iter().filter_map(|s| s.slug.as_deref()).collect();
        assert_eq!(slugs, vec!["generated", "recommended"]);
    }

    #[test]
    fn test_payload_omits_empty_title() {
        let mut settings = default_settings();
        settings.content["en"].title.clear();
        let json = serde_json::to_value(build_payload(&settings)).unwrap();
        let en = json["content"]["en"].as_object().unwrap();
        assert!(!en.contains_key("title"));
        assert!(en.contains_key("header"));
    }

    #[test]
    fn test_payload_empty_language_is_empty_object() {
        let mut settings = default_settings();
        settings
            .content
            .insert("sv".into(), LanguageContent::default());
        let json = serde_json::to_value(build_payload(&settings)).unwrap();
        assert_eq!(json["content"]["sv"], serde_json::json!({}));
    }

    #[test]
    fn test_payload_uses_camel_case_keys() {
        let json = serde_json::to_value(build_payload(&default_settings())).unwrap();
        assert_eq!(json["config"]["showBadge"], true);
        assert_eq!(json["config"]["badgePosition"], "top-left");
        assert!(json["content"]["en"]["sectionsHeader"].is_string());
        assert!(json["content"]["en"]["sections"][0]["noticeText"].is_string());
    }

    #[test]
    fn test_with_language() {
        let payload = build_payload(&default_settings()).with_language("sv");
        assert_eq!(payload.config.language, "sv");
    }

    // ==================== autop Tests ====================

    #[test]
    fn test_autop_single_paragraph() {
        assert_eq!(autop("Hello"), "<p>Hello</p>\n");
    }

    #[test]
    fn test_autop_multiple_paragraphs_and_line_breaks() {
        assert_eq!(
            autop("One\r\nline two\n\nPara two"),
            "<p>One<br />\nline two</p>\n<p>Para two</p>\n"
        );
    }

    #[test]
    fn test_autop_keeps_block_markup() {
        assert_eq!(autop("<p>Already</p>"), "<p>Already</p>\n");
        assert_eq!(autop("<ul><li>x</li></ul>"), "<ul><li>x</li></ul>\n");
    }

    #[test]
    fn test_autop_empty() {
        assert_eq!(autop("  \n "), "");
    }

    // ==================== script / css Tests ====================

    #[test]
    fn test_widget_script_escapes_closing_tags() {
        let mut settings = default_settings();
        settings.content["en"].title = "</script><script>alert(1)".into();
        let script = widget_script(&build_payload(&settings)).unwrap();
        assert!(script.starts_with("<script>"));
        assert_eq!(script.matches("</script>").count(), 1);
        assert!(script.contains("new AGCN({"));
    }

    #[test]
    fn test_style_variables() {
        let style = ConfigStore::embedded().unwrap().styles_default();
        let css = style_variables(&style);
        assert!(css.starts_with(".agcn-variables {"));
        assert!(css.contains("--main-color: #0ea5e9 !important;"));
        assert!(css.ends_with("--badge-offset: 8rem !important;}"));
    }

    #[test]
    fn test_style_variables_skip_invalid_values() {
        let mut style = ConfigStore::embedded().unwrap().styles_default();
        style
            .colors
            .insert(ColorSlot::Main, "red;}body{display:none".into());
        style.badge_offset = "expression(x)".into();
        let css = style_variables(&style);
        assert!(!css.contains("--main-color"));
        assert!(css.contains("--badge-offset: 0rem !important;"));
    }
}
