//! HTML body sanitizing and `cid:` image rewriting.
//!
//! The default blocklist policy removes elements that can run code or pull
//! in arbitrary content, strips inline event handlers and `formaction`, and
//! leaves all other markup intact so the message keeps its layout. The
//! allowlist policy keeps only a fixed set of safe tags and attributes.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use lol_html::{element, rewrite_str, RewriteStrSettings};
use url::Url;

use crate::config::SanitizerPolicy;
use crate::error::{MsgReaderError, Result};
use crate::model::attachment::{normalize, ContentIdMap};

/// Elements removed together with their content under the blocklist policy.
pub const BLOCKED_ELEMENTS: [&str; 5] = ["script", "iframe", "object", "embed", "applet"];

const BLOCKED_SELECTOR: &str = "script, iframe, object, embed, applet";

const CID_PREFIX: &str = "cid:";

/// `true` for attributes that can trigger script: `on*` handlers and `formaction`.
pub fn is_blocked_attribute(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("on") || lower == "formaction"
}

/// `file://` URL for a local path.
pub fn file_url(path: &Path) -> String {
    Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|()| format!("file://{}", path.display()))
}

/// The local URL a `cid:` reference resolves to, if the id is known.
pub fn resolve_cid(src: &str, content_ids: &ContentIdMap) -> Option<String> {
    let cid = src.strip_prefix(CID_PREFIX)?;
    content_ids.resolve(cid).map(file_url)
}

/// Decode `html` leniently as UTF-8 and sanitize it under `policy`.
pub fn sanitize_html(
    html: &[u8],
    content_ids: &ContentIdMap,
    policy: SanitizerPolicy,
) -> Result<String> {
    let text = String::from_utf8_lossy(html);
    match policy {
        SanitizerPolicy::Blocklist => sanitize_blocklist(&text, content_ids),
        SanitizerPolicy::Allowlist => Ok(sanitize_allowlist(&text, content_ids)),
    }
}

/// Remove blocked elements and attributes, rewrite known `cid:` images.
pub fn sanitize_blocklist(html: &str, content_ids: &ContentIdMap) -> Result<String> {
    let settings = RewriteStrSettings {
        element_content_handlers: vec![
            element!(BLOCKED_SELECTOR, |el| {
                el.remove();
                Ok(())
            }),
            element!("*", |el| {
                let blocked: Vec<String> = el
                    .attributes()
                    .iter()
                    .map(|attr| attr.name())
                    .filter(|name| is_blocked_attribute(name))
                    .collect();
                for name in blocked {
                    el.remove_attribute(&name);
                }
                Ok(())
            }),
            element!("img[src]", |el| {
                if let Some(url) = el
                    .get_attribute("src")
                    .and_then(|src| resolve_cid(&src, content_ids))
                {
                    el.set_attribute("src", &url)?;
                }
                Ok(())
            }),
        ],
        ..RewriteStrSettings::new()
    };

    rewrite_str(html, settings).map_err(|e| MsgReaderError::BodyRender(e.to_string()))
}

/// Keep only ammonia's safe tag and attribute set, rewriting known `cid:` images.
pub fn sanitize_allowlist(html: &str, content_ids: &ContentIdMap) -> String {
    let urls: HashMap<String, String> = content_ids
        .iter()
        .map(|(cid, path)| (cid.to_string(), file_url(path)))
        .collect();

    ammonia::Builder::default()
        .add_url_schemes(&["cid", "file"])
        .add_generic_attributes(&["align", "width", "height", "bgcolor"])
        .attribute_filter(move |element, attribute, value| {
            if element == "img" && attribute == "src" {
                if let Some(url) = value
                    .strip_prefix(CID_PREFIX)
                    .and_then(|cid| urls.get(normalize(cid)))
                {
                    return Some(Cow::Owned(url.clone()));
                }
            }
            Some(Cow::Borrowed(value))
        })
        .clean(html)
        .to_string()
}
