//! Sanitization of untrusted admin submissions.
//!
//! - `text`: field-level filters (plain text, rich text, colors, slugs)
//! - `settings`: reconciles a settings submission with the persisted document
//! - `styles`: reconciles a style submission with the persisted document

pub mod settings;
pub mod styles;
pub mod text;

pub use settings::{sanitize_settings, REMOVE_LANGUAGE_KEY};
pub use styles::sanitize_styles;
pub use text::{
    normalize_slug, sanitize_css_length, sanitize_hex_color, sanitize_rich_text, sanitize_text,
};
