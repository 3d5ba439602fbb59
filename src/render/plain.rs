//! Plain-text bodies wrapped for HTML display.

use html_escape::encode_safe;

use crate::i18n;

const PRE_STYLE: &str = "white-space: pre-wrap; word-wrap: break-word; font-family: sans-serif;";

/// Escape `text` and wrap it in a wrapping `<pre>` block.
pub fn render_plain(text: &str) -> String {
    format!("<pre style=\"{PRE_STYLE}\">{}</pre>", encode_safe(text))
}

/// Italic placeholder for a message with neither HTML nor text.
pub fn render_empty() -> String {
    format!("<i>{}</i>", encode_safe(i18n::body_no_content()))
}
