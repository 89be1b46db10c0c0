//! Field-level sanitizers: plain text, allow-listed rich text, colors, slugs.

use ammonia::{Builder, UrlRelative};
use regex::Regex;
use std::sync::OnceLock;

/// Tags (and their permitted attributes) allowed in rich-text fields.
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "target"]),
    ("strong", &[]),
    ("em", &[]),
    ("u", &[]),
    ("p", &[]),
    ("br", &[]),
    ("ul", &[]),
    ("ol", &[]),
    ("li", &[]),
];

/// URL schemes accepted in `href`.
const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "mailto", "tel", "ftp", "ftps", "sms"];

/// Elements removed together with their contents.
const DROPPED_CONTENT_TAGS: &[&str] = &["script", "style"];

static RICH_TEXT_CLEANER: OnceLock<Builder<'static>> = OnceLock::new();
static PLAIN_TEXT_CLEANER: OnceLock<Builder<'static>> = OnceLock::new();
static PERCENT_OCTET_REGEX: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
static CSS_LENGTH_REGEX: OnceLock<Regex> = OnceLock::new();

fn rich_text_cleaner() -> &'static Builder<'static> {
    RICH_TEXT_CLEANER.get_or_init(|| {
        let mut builder = Builder::empty();
        for (tag, attributes) in ALLOWED_TAGS {
            builder.add_tags([*tag]);
            builder.add_tag_attributes(*tag, attributes.iter().copied());
        }
        builder
            .add_url_schemes(ALLOWED_PROTOCOLS.iter().copied())
            .url_relative(UrlRelative::PassThrough)
            .link_rel(None)
            .add_clean_content_tags(DROPPED_CONTENT_TAGS.iter().copied())
            .strip_comments(true);
        builder
    })
}

fn plain_text_cleaner() -> &'static Builder<'static> {
    PLAIN_TEXT_CLEANER.get_or_init(|| {
        let mut builder = Builder::empty();
        builder
            .add_clean_content_tags(DROPPED_CONTENT_TAGS.iter().copied())
            .strip_comments(true);
        builder
    })
}

/// Filter markup down to the rich-text allow-list.
///
/// Disallowed tags and comments are removed (their text content stays),
/// disallowed attributes are dropped, and stray `<`/`>` in text are encoded.
/// `href` values are checked after entity decoding, so an encoded
/// `javascript:` is rejected like a literal one.
/// Applying the filter to its own output returns it unchanged.
pub fn sanitize_rich_text(input: &str) -> String {
    rich_text_cleaner().clean(input).to_string()
}

/// Reduce input to a single line of plain text.
///
/// All tags are stripped (script and style contents included), a lone `<` is
/// encoded, whitespace runs collapse to one space, percent-encoded octets are
/// removed and the result is trimmed.
pub fn sanitize_text(input: &str) -> String {
    // Only `<` stays encoded.
    let stripped = plain_text_cleaner()
        .clean(input)
        .to_string()
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    let whitespace = WHITESPACE_REGEX.get_or_init(|| Regex::new(r"[\r\n\t ]+").unwrap());
    let mut text = whitespace.replace_all(&stripped, " ").trim().to_string();

    let octets = PERCENT_OCTET_REGEX.get_or_init(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap());
    while octets.is_match(&text) {
        text = octets.replace_all(&text, "").to_string();
    }

    whitespace.replace_all(&text, " ").trim().to_string()
}

/// Normalize a section slug to `^[a-z]+$`: lowercase, then drop every other
/// character. May return an empty string.
pub fn normalize_slug(input: &str) -> String {
    sanitize_text(input)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// `#rgb` or `#rrggbb`; anything else is rejected.
pub fn sanitize_hex_color(input: &str) -> Option<String> {
    let regex = HEX_COLOR_REGEX
        .get_or_init(|| Regex::new(r"^#([A-Fa-f0-9]{3}){1,2}$").unwrap());
    let trimmed = input.trim();
    regex.is_match(trimmed).then(|| trimmed.to_string())
}

/// A CSS length usable as the badge offset (`0`, `8rem`, `-4px`, `2.5%`).
pub fn sanitize_css_length(input: &str) -> Option<String> {
    let regex = CSS_LENGTH_REGEX.get_or_init(|| {
        Regex::new(r"^(0|-?(\d+(\.\d+)?|\.\d+)(px|rem|em|%|vh|vw))$").unwrap()
    });
    let text = sanitize_text(input);
    regex.is_match(&text).then_some(text)
}
