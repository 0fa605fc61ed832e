//! Text helpers shared by the prompt builders and the classroom export
//!
//! UTF-8 safe truncation, single-pass template filling, HTML escaping and
//! file-name slugs.

/// Keep the first `max_chars` characters; `...` marks a cut.
pub fn safe_truncate(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        None => input.to_string(),
        Some((cut, _)) if max_chars > 0 => format!("{}...", &input[..cut]),
        Some(_) => String::new(),
    }
}

/// Replace `<open>NAME<close>` markers with the value of slot `NAME` in a
/// single left-to-right pass. Inserted values are never rescanned; unknown
/// or unterminated markers are copied as they are.
pub fn fill_template(template: &str, open: &str, close: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 1024);
    let mut rest = template;
    while let Some(start) = rest.find(open) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];
        let filled = after.find(close).and_then(|end| {
            let name = &after[..end];
            slots
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| (*value, end))
        });
        match filled {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + close.len()..];
            }
            None => {
                out.push_str(open);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for an HTML text node or a double-quoted attribute.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Make JSON safe to inline inside a `<script>` element.
///
/// `</` would close the script early and `<!--` switches the tokenizer into
/// escaped mode; U+2028/U+2029 are line terminators for older JavaScript
/// parsers but legal inside JSON strings.
pub fn escape_json_for_script(json: &str) -> String {
    json.replace("</", "<\\/")
        .replace("<!--", "\\u003c!--")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Collapse every whitespace run into a single `_`.
pub fn underscore_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join("_")
}
