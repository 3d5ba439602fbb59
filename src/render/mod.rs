//! Turn a parsed message body into display-ready HTML.
//!
//! HTML bodies are sanitized, plain-text bodies are escaped into a `<pre>`
//! block, and a message with neither gets a placeholder. Rendering never
//! fails: a sanitizer error becomes an inline error paragraph.

pub mod plain;
pub mod sanitize;

use html_escape::encode_safe;
use tracing::warn;

use crate::config::SanitizerPolicy;
use crate::error::MsgReaderError;
use crate::i18n;
use crate::model::attachment::ContentIdMap;
use crate::model::message::ParsedMessage;

pub use plain::{render_empty, render_plain};
pub use sanitize::{file_url, sanitize_html};

/// Display HTML for `message`, with `cid:` images pointing into the scratch directory.
pub fn render_body(
    message: &ParsedMessage,
    content_ids: &ContentIdMap,
    policy: SanitizerPolicy,
) -> String {
    if let Some(html) = message.html_body.as_deref().filter(|b| !b.is_empty()) {
        return match sanitize_html(html, content_ids, policy) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(error = %e, "Could not render HTML body");
                render_error(&e)
            }
        };
    }

    match message.body.as_deref() {
        Some(text) if !text.is_empty() => render_plain(text),
        _ => render_empty(),
    }
}

/// Inline red error paragraph shown in place of an unreadable body.
pub fn render_error(err: &MsgReaderError) -> String {
    format!(
        "<p style=\"color:red;\"><b>{}</b><br>{}: {}</p>",
        encode_safe(i18n::err_body_unreadable()),
        encode_safe(i18n::body_error_label()),
        encode_safe(&err.to_string()),
    )
}
