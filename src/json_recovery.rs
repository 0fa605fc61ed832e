//! JSON recovery for model output
//!
//! The model is asked for pure JSON but regularly wraps it in markdown fences,
//! prefixes it with chatter, or leaves a trailing comma behind. Recovery is
//! layered: strict parse, then fence/prefix cleanup, then slicing the outermost
//! brace (or bracket) pair, then a trailing-comma repair. Anything still
//! unparseable yields `None`, which callers report as a generation failure.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::utils::safe_truncate;

static RE_CODE_FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*```[\w-]*\s*$").expect("static regex"));
static RE_TILDE_FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*~~~[\w-]*\s*$").expect("static regex"));
static RE_BACKTICK_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("static regex"));
static RE_TILDE_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~~").expect("static regex"));
static RE_TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("static regex"));

const CHATTER_PREFIXES: &[&str] = &[
    "Aquí está el JSON:",
    "Aquí tienes el JSON:",
    "Respuesta:",
    "Here is the JSON:",
    "JSON:",
    "Result:",
    "Output:",
];

/// Recover a JSON document (object or array) from raw model text.
pub fn recover_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_document(trimmed) {
        return Some(value);
    }

    // Fence lines first; inline backticks only when that is not enough, since
    // lesson content may legitimately quote code with them.
    for cleaned in [strip_fence_lines(trimmed), clean_json_response(trimmed)] {
        if let Some(value) = parse_document(&cleaned) {
            return Some(value);
        }
        let Some(candidate) = extract_json_from_text(&cleaned) else {
            continue;
        };
        if let Some(value) = parse_document(candidate) {
            return Some(value);
        }
        if let Some(value) = parse_document(&fix_common_json_errors(candidate)) {
            debug!("[JsonRecovery] recovered after trailing-comma repair");
            return Some(value);
        }
    }

    warn!(
        "[JsonRecovery] unrecoverable model output ({} chars): {}",
        text.len(),
        safe_truncate(trimmed, 160)
    );
    None
}

/// Parse and keep only structured documents; bare scalars are not answers.
fn parse_document(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// Drop whole-line markdown fences (nested ones included) and chatter prefixes.
pub(crate) fn strip_fence_lines(content: &str) -> String {
    let cleaned = RE_CODE_FENCE_LINE.replace_all(content.trim(), "");
    let cleaned = RE_TILDE_FENCE_LINE.replace_all(&cleaned, "");
    strip_chatter_prefix(cleaned.trim())
}

/// Like [`strip_fence_lines`], but also removes inline fence markers.
pub(crate) fn clean_json_response(content: &str) -> String {
    let cleaned = strip_fence_lines(content);
    let cleaned = RE_BACKTICK_INLINE.replace_all(&cleaned, "");
    let cleaned = RE_TILDE_INLINE.replace_all(&cleaned, "");
    strip_chatter_prefix(cleaned.trim())
}

fn strip_chatter_prefix(content: &str) -> String {
    for prefix in CHATTER_PREFIXES {
        if let Some(rest) = content.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    content.to_string()
}

/// Slice the outermost `{...}` pair. `[...]` is used when the text holds no
/// object at all, or when it encloses the object slice (an array of objects).
/// An opening brace without a closing one yields `None`.
pub(crate) fn extract_json_from_text(text: &str) -> Option<&str> {
    let Some(open) = text.find('{') else {
        return slice_between(text, '[', ']');
    };
    let object = slice_between(text, '{', '}')?;
    let object_end = open + object.len();
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < open && end >= object_end => Some(&text[start..=end]),
        _ => Some(object),
    }
}

fn slice_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Remove trailing commas before a closing brace or bracket.
pub(crate) fn fix_common_json_errors(json_str: &str) -> String {
    RE_TRAILING_COMMA.replace_all(json_str, "$1").to_string()
}
