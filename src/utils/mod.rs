pub mod text;

pub use text::{escape_html, escape_json_for_script, fill_template, safe_truncate, underscore_whitespace};
