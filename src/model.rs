//! Persisted documents: the settings document and the style document.
//!
//! Both are stored as JSON under a fixed name and round-trip through these
//! types. Every field carries a serde default so a partially written document
//! (for example a language added as `{}`) still deserializes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document name of the settings document.
pub const SETTINGS_DOCUMENT: &str = "agcn_options";

/// Document name of the style document.
pub const STYLE_DOCUMENT: &str = "agcn_styles";

/// Document name of the one-shot admin notice.
pub const NOTICE_DOCUMENT: &str = "agcn_admin_notice";

/// Screen corner the badge is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgePosition {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl BadgePosition {
    pub const ALL: [BadgePosition; 4] = [
        BadgePosition::TopLeft,
        BadgePosition::TopRight,
        BadgePosition::BottomLeft,
        BadgePosition::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgePosition::TopLeft => "top-left",
            BadgePosition::TopRight => "top-right",
            BadgePosition::BottomLeft => "bottom-left",
            BadgePosition::BottomRight => "bottom-right",
        }
    }

    pub fn from_str_opt(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for BadgePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Widget display options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Active language code; always a key of `SettingsDocument::content`.
    pub language: String,
    #[serde(default)]
    pub support: bool,
    #[serde(default)]
    pub show_badge: bool,
    #[serde(default)]
    pub badge_position: BadgePosition,
}

/// A named sub-notice referenced by a block's `aiContent` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub notice_text: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Per-language content bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LanguageContent {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sections_header: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl LanguageContent {
    /// First section carrying `slug`. Slugs are not unique, so later
    /// duplicates are shadowed.
    pub fn section_by_slug(&self, slug: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.slug == slug)
    }
}

/// Root settings aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub config: DisplayConfig,
    /// Language code -> content, in insertion order.
    pub content: IndexMap<String, LanguageContent>,
}

impl SettingsDocument {
    pub fn has_language(&self, code: &str) -> bool {
        self.content.contains_key(code)
    }

    /// Content bundle of the active language.
    pub fn active_content(&self) -> Option<&LanguageContent> {
        self.content.get(&self.config.language)
    }

    /// Point `config.language` at an existing key, keeping it when valid and
    /// otherwise falling back to the first key in document order.
    pub fn repair_active_language(&mut self) {
        if self.content.contains_key(&self.config.language) {
            return;
        }
        if let Some(first) = self.content.keys().next() {
            self.config.language = first.clone();
        }
    }
}

/// Named color slots of the style document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorSlot {
    #[serde(rename = "main-color")]
    Main,
    #[serde(rename = "badge-color")]
    Badge,
    #[serde(rename = "badge-bg-color")]
    BadgeBg,
    #[serde(rename = "badge-bg-color-hover")]
    BadgeBgHover,
    #[serde(rename = "badge-border-color")]
    BadgeBorder,
    #[serde(rename = "modal-color")]
    Modal,
    #[serde(rename = "modal-bg-color")]
    ModalBg,
    #[serde(rename = "modal-border-color")]
    ModalBorder,
    #[serde(rename = "modal-icon-color")]
    ModalIcon,
    #[serde(rename = "modal-support-color")]
    ModalSupport,
    #[serde(rename = "modal-accordion-open-bg-color")]
    ModalAccordionOpenBg,
    #[serde(rename = "notice-color")]
    Notice,
    #[serde(rename = "notice-bg-color")]
    NoticeBg,
    #[serde(rename = "notice-border-color")]
    NoticeBorder,
}

impl ColorSlot {
    pub const ALL: [ColorSlot; 14] = [
        ColorSlot::Main,
        ColorSlot::Badge,
        ColorSlot::BadgeBg,
        ColorSlot::BadgeBgHover,
        ColorSlot::BadgeBorder,
        ColorSlot::Modal,
        ColorSlot::ModalBg,
        ColorSlot::ModalBorder,
        ColorSlot::ModalIcon,
        ColorSlot::ModalSupport,
        ColorSlot::ModalAccordionOpenBg,
        ColorSlot::Notice,
        ColorSlot::NoticeBg,
        ColorSlot::NoticeBorder,
    ];

    /// Key used in the document and as the CSS custom property name.
    pub fn key(&self) -> &'static str {
        match self {
            ColorSlot::Main => "main-color",
            ColorSlot::Badge => "badge-color",
            ColorSlot::BadgeBg => "badge-bg-color",
            ColorSlot::BadgeBgHover => "badge-bg-color-hover",
            ColorSlot::BadgeBorder => "badge-border-color",
            ColorSlot::Modal => "modal-color",
            ColorSlot::ModalBg => "modal-bg-color",
            ColorSlot::ModalBorder => "modal-border-color",
            ColorSlot::ModalIcon => "modal-icon-color",
            ColorSlot::ModalSupport => "modal-support-color",
            ColorSlot::ModalAccordionOpenBg => "modal-accordion-open-bg-color",
            ColorSlot::Notice => "notice-color",
            ColorSlot::NoticeBg => "notice-bg-color",
            ColorSlot::NoticeBorder => "notice-border-color",
        }
    }
}

/// Styling document: colors plus the badge's distance from the viewport edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default)]
    pub colors: IndexMap<ColorSlot, String>,
    #[serde(rename = "badge-offset", default = "default_badge_offset")]
    pub badge_offset: String,
}

fn default_badge_offset() -> String {
    "0rem".to_string()
}

/// Kind of a one-shot admin notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Message shown once on the next admin page view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNotice {
    pub kind: NoticeKind,
    pub message: String,
    pub dismissible: bool,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
