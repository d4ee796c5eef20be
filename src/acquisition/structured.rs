//! JSON-LD text salvage.
//!
//! Pulls embedded structured data out of rendered HTML. News and article
//! pages that render their body into an iframe or shadow root often still
//! carry the full text in a `<script type="application/ld+json">` block, so
//! this is the escalation path when the rendered plain text is too short.

use scraper::{Html, Selector};
use serde_json::Value;

/// Fields worth salvaging, in no particular priority; the longest value
/// wins regardless of which field it came from.
const TEXT_FIELDS: [&str; 3] = ["articleBody", "description", "headline"];

/// Return the longest textual field found in any JSON-LD block, or an empty
/// string when there is nothing to salvage.
///
/// Malformed blocks are skipped silently. Only top-level objects and
/// top-level arrays of objects are inspected.
pub fn extract_jsonld_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();

    let mut candidates: Vec<String> = Vec::new();
    for element in document.select(&sel) {
        let raw = element.inner_html();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => continue,
        };

        let items: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for item in items {
            if !item.is_object() {
                continue;
            }
            for field in TEXT_FIELDS {
                if let Some(text) = item.get(field).and_then(|v| v.as_str()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        candidates.push(text.to_string());
                    }
                }
            }
        }
    }

    candidates
        .into_iter()
        .max_by_key(|t| t.len())
        .unwrap_or_default()
}
