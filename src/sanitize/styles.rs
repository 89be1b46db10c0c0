//! Style sanitizer: per-slot hex colors and the badge offset, each falling
//! back to the previously persisted value.

use super::text::{sanitize_css_length, sanitize_hex_color};
use crate::model::{ColorSlot, StyleDocument};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

pub fn sanitize_styles(raw: &Value, previous: &StyleDocument) -> StyleDocument {
    let Value::Object(input) = raw else {
        return previous.clone();
    };

    let colors = match input.get("colors") {
        Some(Value::Object(submitted)) => ColorSlot::ALL
            .iter()
            .filter_map(|slot| {
                let accepted = submitted
                    .get(slot.key())
                    .and_then(Value::as_str)
                    .and_then(sanitize_hex_color);
                if accepted.is_none() && submitted.contains_key(slot.key()) {
                    warn!("Rejected color for {}, keeping previous value", slot.key());
                }
                accepted
                    .or_else(|| previous.colors.get(slot).cloned())
                    .map(|color| (*slot, color))
            })
            .collect::<IndexMap<_, _>>(),
        _ => previous.colors.clone(),
    };

    let badge_offset = input
        .get("badge-offset")
        .and_then(Value::as_str)
        .and_then(sanitize_css_length)
        .unwrap_or_else(|| previous.badge_offset.clone());

    StyleDocument {
        colors,
        badge_offset,
    }
}
