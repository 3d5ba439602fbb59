//! The parsed form of one `.msg` file.

use chrono::{DateTime, Local, Utc};

/// Date of a message, as found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDate {
    /// Decoded from a MAPI time property.
    Timestamp(DateTime<Utc>),
    /// Raw `Date:` header text from the transport headers, kept verbatim.
    Header(String),
}

impl MessageDate {
    /// Value suitable for a `Date:` header.
    pub fn to_header_value(&self) -> String {
        match self {
            Self::Timestamp(ts) => ts.with_timezone(&Local).to_rfc2822(),
            Self::Header(raw) => raw.clone(),
        }
    }
}

impl std::fmt::Display for MessageDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp(ts) => write!(
                f,
                "{}",
                ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %z")
            ),
            Self::Header(raw) => f.write_str(raw),
        }
    }
}

/// One attachment as stored in the `.msg` file.
#[derive(Debug, Clone, Default)]
pub struct AttachmentRecord {
    /// Original filename. May contain path separators or other hostile characters.
    pub filename: String,

    /// Binary payload. `None` when the attachment is an embedded message or
    /// OLE object with no byte stream.
    pub data: Option<Vec<u8>>,

    /// Content-ID used by `cid:` references in the HTML body.
    pub content_id: Option<String>,

    /// MIME type recorded by the sender's client, if any.
    pub mime_tag: Option<String>,
}

/// Immutable snapshot of one `.msg` file.
///
/// Recipients are free-form display text (`"A <a@x.com>; B <b@y.com>"`),
/// exactly as the source presents them.
#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
    /// Subject line.
    pub subject: Option<String>,

    /// Sender, usually `"Name <address>"`.
    pub sender: Option<String>,

    /// Primary recipients.
    pub to: Option<String>,

    /// Carbon-copy recipients.
    pub cc: Option<String>,

    /// Sent or delivery date.
    pub date: Option<MessageDate>,

    /// Plain-text body.
    pub body: Option<String>,

    /// HTML body bytes, encoding unspecified.
    pub html_body: Option<Vec<u8>>,

    /// Attachments in storage order.
    pub attachments: Vec<AttachmentRecord>,
}

impl ParsedMessage {
    /// `true` if the message carries an HTML body.
    pub fn has_html(&self) -> bool {
        self.html_body.as_ref().is_some_and(|b| !b.is_empty())
    }
}
