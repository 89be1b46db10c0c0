//! Block annotations: `aiContent` / `agcnPosition` attributes on editor
//! blocks, rendered as `data-*` attributes on the block's root element, and
//! stripped from stored post markup on uninstall.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Block types that accept an annotation.
pub const ANNOTATED_BLOCKS: [&str; 16] = [
    "core/paragraph",
    "core/group",
    "core/code",
    "core/details",
    "core/embed",
    "core/footnotes",
    "core/image",
    "core/form",
    "core/html",
    "core/list",
    "core/post-content",
    "core/post-excerpt",
    "core/post-featured-image",
    "core/table",
    "core/verse",
    "core/video",
];

pub const AI_CONTENT_ATTRIBUTE: &str = "aiContent";
pub const POSITION_ATTRIBUTE: &str = "agcnPosition";

static BLOCK_DELIMITER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Where the inline notice sits relative to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockPosition {
    Left,
    Center,
    Right,
}

impl BlockPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockPosition::Left => "left",
            BlockPosition::Center => "center",
            BlockPosition::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(BlockPosition::Left),
            "center" => Some(BlockPosition::Center),
            "right" => Some(BlockPosition::Right),
            _ => None,
        }
    }
}

/// Annotation carried by a block's attributes. `ai_content` is the slug of a
/// section of the active language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockAnnotation {
    pub ai_content: Option<String>,
    pub agcn_position: Option<BlockPosition>,
}

impl BlockAnnotation {
    /// Read the annotation out of a block's attribute object. Empty strings
    /// count as absent and unknown positions are dropped.
    pub fn from_attrs(attrs: &Value) -> Self {
        let ai_content = attrs
            .get(AI_CONTENT_ATTRIBUTE)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let agcn_position = attrs
            .get(POSITION_ATTRIBUTE)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .and_then(|raw| {
                let parsed = BlockPosition::parse(raw);
                if parsed.is_none() {
                    warn!("Ignoring unknown block position: {}", raw);
                }
                parsed
            });

        Self {
            ai_content,
            agcn_position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ai_content.is_none() && self.agcn_position.is_none()
    }
}

pub fn is_annotated_block(block_name: &str) -> bool {
    ANNOTATED_BLOCKS.contains(&block_name)
}

/// Render-time filter: tag the root element of an allow-listed block with
/// `data-ai-content` and `data-agcn-position`.
///
/// Content is returned unchanged when the block is not allow-listed, carries
/// no annotation, or has no root element.
pub fn annotate_block(block_name: &str, attrs: &Value, content: &str) -> String {
    if !is_annotated_block(block_name) {
        return content.to_string();
    }

    let annotation = BlockAnnotation::from_attrs(attrs);
    if annotation.is_empty() {
        return content.to_string();
    }

    let mut injected = Vec::with_capacity(2);
    if let Some(slug) = &annotation.ai_content {
        injected.push(("data-ai-content", slug.as_str()));
    }
    if let Some(position) = annotation.agcn_position {
        injected.push(("data-agcn-position", position.as_str()));
    }

    match inject_root_attributes(content, &injected) {
        Some(html) => html,
        None => {
            debug!("Block {} has no root element, leaving it as is", block_name);
            content.to_string()
        }
    }
}

/// Rewrite the opening tag of the first top-level element, replacing or
/// appending `attributes`. Everything outside that tag is copied verbatim.
fn inject_root_attributes(content: &str, attributes: &[(&str, &str)]) -> Option<String> {
    let dom = tl::parse(content, tl::ParserOptions::default()).ok()?;
    let parser = dom.parser();
    let root = dom
        .children()
        .iter()
        .filter_map(|handle| handle.get(parser))
        .find_map(|node| node.as_tag())?;

    let (start, _) = root.boundaries(parser);
    if !content.get(start..)?.starts_with('<') {
        return None;
    }
    let end = start_tag_end(content, start)?;
    let self_closing = content[start..end].ends_with("/>");

    let existing = root.attributes();
    let mut kept: Vec<(String, Option<String>)> = existing
        .iter()
        .map(|(name, value)| (name.into_owned(), value.map(|v| v.into_owned())))
        .collect();
    // `id` and `class` are cached apart from the other attributes.
    for (name, cached) in [("class", existing.class()), ("id", existing.id())] {
        if let Some(value) = cached {
            if !kept.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)) {
                kept.insert(0, (name.to_string(), Some(value.as_utf8_str().into_owned())));
            }
        }
    }

    let mut tag = format!("<{}", root.name().as_utf8_str());
    for (name, value) in &kept {
        if attributes.iter().any(|(injected, _)| name.eq_ignore_ascii_case(injected)) {
            continue;
        }
        tag.push(' ');
        tag.push_str(name);
        if let Some(value) = value {
            let _ = write!(tag, "=\"{}\"", value.replace('"', "&quot;"));
        }
    }
    for (name, value) in attributes {
        let _ = write!(tag, " {}=\"{}\"", name, escape_attribute(value));
    }
    tag.push_str(if self_closing { " />" } else { ">" });

    let mut html = String::with_capacity(content.len() + tag.len());
    html.push_str(&content[..start]);
    html.push_str(&tag);
    html.push_str(&content[end..]);
    Some(html)
}

/// Byte offset just past the `>` closing the tag that opens at `start`.
fn start_tag_end(content: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, c) in content[start..].char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn block_delimiter_regex() -> &'static Regex {
    BLOCK_DELIMITER_REGEX.get_or_init(|| {
        Regex::new(
            r"(?s)<!--\s+wp:(?P<name>[a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)?)\s+(?P<attrs>\{.*?\})\s+(?P<void>/)?-->",
        )
        .unwrap()
    })
}

/// Serialize block attributes the way the editor does, keeping `--`, `<`,
/// `>` and `&` out of the HTML comment.
fn serialize_block_attributes(attrs: &Map<String, Value>) -> Option<String> {
    let json = serde_json::to_string(attrs).ok()?;
    Some(
        json.replace("--", "\\u002d\\u002d")
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .replace('&', "\\u0026"),
    )
}

/// Remove `aiContent` and `agcnPosition` from every block delimiter in
/// `post_content`. Returns `None` when nothing was removed.
pub fn strip_annotations(post_content: &str) -> Option<String> {
    let mut changed = false;

    let rewritten = block_delimiter_regex().replace_all(post_content, |caps: &Captures| {
        let original = caps[0].to_string();
        let Ok(Value::Object(mut attrs)) = serde_json::from_str::<Value>(&caps["attrs"]) else {
            return original;
        };

        let removed_content = attrs.shift_remove(AI_CONTENT_ATTRIBUTE).is_some();
        let removed_position = attrs.shift_remove(POSITION_ATTRIBUTE).is_some();
        if !removed_content && !removed_position {
            return original;
        }

        let closer = if caps.name("void").is_some() { "/-->" } else { "-->" };
        let rebuilt = if attrs.is_empty() {
            Some(format!("<!-- wp:{} {}", &caps["name"], closer))
        } else {
            serialize_block_attributes(&attrs)
                .map(|json| format!("<!-- wp:{} {} {}", &caps["name"], json, closer))
        };

        match rebuilt {
            Some(delimiter) => {
                changed = true;
                delimiter
            }
            None => original,
        }
    });

    changed.then(|| rewritten.into_owned())
}
