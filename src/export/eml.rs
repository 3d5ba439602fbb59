//! Export the loaded `.msg` as a standalone `.eml` file.
//!
//! The source is re-parsed from disk rather than reusing the display state,
//! so the export always reflects the original file.

use std::path::{Path, PathBuf};

use chrono::Local;
use mail_builder::headers::address::Address;
use mail_builder::headers::content_type::ContentType;
use mail_builder::headers::message_id::MessageId;
use mail_builder::headers::raw::Raw;
use mail_builder::headers::text::Text;
use mail_builder::headers::HeaderType;
use mail_builder::MessageBuilder;
use tracing::{debug, info};

use crate::error::{MsgReaderError, Result};
use crate::i18n;
use crate::model::address::Mailbox;
use crate::model::message::ParsedMessage;
use crate::parser::msg::parse_msg;
use crate::scratch::ScratchDirectory;

/// Re-parse `source` and write `<scratch>/<source stem>.eml`.
///
/// A previous export of the same name is replaced, but a path listed in
/// `keep` (the loaded message's saved attachments) never is: the export then
/// gets a `_N` suffix instead. Returns the path of the written file.
pub fn export_eml(
    source: &Path,
    scratch: &ScratchDirectory,
    message_id_domain: &str,
    keep: &[&Path],
) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(MsgReaderError::SourceMissing(source.to_path_buf()));
    }

    let message = parse_msg(source).map_err(|e| MsgReaderError::Export(e.to_string()))?;
    let bytes = build_eml(&message, message_id_domain)?;

    scratch.ensure().map_err(|e| MsgReaderError::Export(e.to_string()))?;
    let name = eml_filename(source);
    let mut path = scratch.path().join(&name);
    if keep.contains(&path.as_path()) {
        path = scratch.unique_path(&name);
    }
    std::fs::write(&path, &bytes)
        .map_err(|e| MsgReaderError::Export(format!("'{}': {e}", path.display())))?;

    info!(path = %path.display(), size = bytes.len(), "Exported message");
    Ok(path)
}

/// Serialize `message` as an RFC 5322 document with a fresh Message-ID.
///
/// Header text containing CR or LF is refused with [`MsgReaderError::Export`].
pub fn build_eml(message: &ParsedMessage, message_id_domain: &str) -> Result<Vec<u8>> {
    let mut builder = MessageBuilder::new();

    if let Some(subject) = &message.subject {
        builder = builder.subject(Text::new(single_line("Subject", subject)?));
    }
    if let Some(from) = &message.sender {
        builder = builder.header("From", address_header(single_line("From", from)?));
    }
    if let Some(to) = &message.to {
        builder = builder.header("To", address_header(single_line("To", to)?));
    }
    if let Some(cc) = &message.cc {
        builder = builder.header("Cc", address_header(single_line("Cc", cc)?));
    }

    let date = match &message.date {
        Some(date) => date.to_header_value(),
        None => Local::now().to_rfc2822(),
    };
    builder = builder
        .header("Date", Raw::new(single_line("Date", &date)?.to_string()))
        .message_id(MessageId::new(new_message_id(message_id_domain)));

    builder = match (&message.html_body, &message.body) {
        (Some(html), _) if !html.is_empty() => builder
            .text_body(i18n::eml_html_stub())
            .html_body(String::from_utf8_lossy(html).into_owned()),
        (_, Some(text)) if !text.is_empty() => builder.text_body(text.as_str()),
        _ => builder.text_body(i18n::eml_no_content()),
    };

    for (index, attachment) in message.attachments.iter().enumerate() {
        let Some(data) = attachment.data.as_deref() else {
            debug!(filename = %attachment.filename, "No payload, not exported");
            continue;
        };
        let filename = basename(&attachment.filename)
            .map(|name| name.replace(char::is_control, "_"))
            .unwrap_or_else(|| format!("attachment_{index}"));
        let mime = content_type(&filename, attachment.mime_tag.as_deref());
        builder = builder.attachment(ContentType::new(mime), filename, data);
    }

    builder
        .write_to_vec()
        .map_err(|e| MsgReaderError::Export(e.to_string()))
}

/// `value` unchanged, or an export error if it would span several header lines.
fn single_line<'a>(header: &str, value: &'a str) -> Result<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(MsgReaderError::Export(format!(
            "{header} header contains a line break"
        )));
    }
    Ok(value)
}

/// Type guessed from the extension, else the sender's recorded MIME tag, else
/// `application/octet-stream`.
fn content_type(filename: &str, mime_tag: Option<&str>) -> String {
    if let Some(guess) = mime_guess::from_path(filename).first() {
        return guess.essence_str().to_string();
    }
    mime_tag
        .map(str::trim)
        .and_then(|tag| tag.parse::<mime_guess::Mime>().ok())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// `<uuid>@<domain>`, without angle brackets.
pub fn new_message_id(domain: &str) -> String {
    format!("{}@{}", uuid::Uuid::new_v4().simple(), domain)
}

/// From/To/Cc value: structured mailboxes when every entry has an `@`, else encoded text.
fn address_header(raw: &str) -> HeaderType<'static> {
    let Some(parsed) = Mailbox::parse_list(raw) else {
        return Text::new(raw.to_string()).into();
    };

    let mut mailboxes: Vec<Address<'static>> = parsed
        .into_iter()
        .map(|m| Address::new_address(m.name, m.email))
        .collect();

    if mailboxes.len() == 1 {
        mailboxes.remove(0).into()
    } else {
        Address::new_list(mailboxes).into()
    }
}

/// Last path component of `name`, split on either separator.
fn basename(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn eml_filename(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "message".to_string());
    format!("{stem}.eml")
}
