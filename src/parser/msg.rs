//! Outlook `.msg` reader.
//!
//! A `.msg` file is an OLE compound file holding MAPI properties for one
//! message, one `__recip_version1.0_#XXXXXXXX` storage per recipient and one
//! `__attach_version1.0_#XXXXXXXX` storage per attachment.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use tracing::{debug, warn};

use crate::error::{MsgReaderError, Result};
use crate::model::message::{AttachmentRecord, MessageDate, ParsedMessage};
use crate::parser::props::{
    codepage_encoding, tags, PropertyStorage, StorageKind, PROPERTIES_STREAM,
};
use crate::parser::rtf;
use crate::parser::transport::parse_transport_headers;

const RECIPIENT_PREFIX: &str = "__recip_version1.0_#";
const ATTACHMENT_PREFIX: &str = "__attach_version1.0_#";

/// `PR_RECIPIENT_TYPE` values.
const MAPI_TO: u32 = 1;
const MAPI_CC: u32 = 2;

/// Parse a `.msg` file into a [`ParsedMessage`].
///
/// Fails with [`MsgReaderError::InvalidMessage`] if the file is not a
/// compound document or has no message property stream.
pub fn parse_msg(path: impl AsRef<Path>) -> Result<ParsedMessage> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| MsgReaderError::io(path, e))?;
    let mut compound =
        CompoundFile::open(file).map_err(|e| MsgReaderError::invalid_message(path, e))?;

    let root = Path::new("/");
    if !compound.is_stream(root.join(PROPERTIES_STREAM)) {
        return Err(MsgReaderError::invalid_message(
            path,
            "missing message property stream",
        ));
    }

    read_message(&mut compound, root).map_err(|e| MsgReaderError::invalid_message(path, e))
}

/// Read one message storage. Per-attachment read errors are logged and leave
/// that attachment without data; everything else is an error.
fn read_message<F: Read + Seek>(
    compound: &mut CompoundFile<F>,
    root: &Path,
) -> std::io::Result<ParsedMessage> {
    let mut storage = PropertyStorage::new(compound, root, encoding_rs::WINDOWS_1252);

    let fixed = storage.fixed(StorageKind::Message)?;
    if let Some(cp) = fixed
        .long(tags::INTERNET_CPID)
        .or_else(|| fixed.long(tags::MESSAGE_CODEPAGE))
    {
        storage.set_encoding(codepage_encoding(cp));
    }

    let headers = storage
        .string(tags::TRANSPORT_MESSAGE_HEADERS)?
        .map(|raw| parse_transport_headers(&raw))
        .unwrap_or_default();

    let subject = storage.string(tags::SUBJECT)?;
    let sender = match headers.from {
        Some(ref from) => Some(from.clone()),
        None => sender_from_properties(&mut storage)?,
    };

    let (table_to, table_cc) = read_recipients(&mut storage)?;
    let to = headers
        .to
        .clone()
        .or(table_to)
        .or(storage.string(tags::DISPLAY_TO)?);
    let cc = headers
        .cc
        .clone()
        .or(table_cc)
        .or(storage.string(tags::DISPLAY_CC)?);

    let date = headers
        .date
        .clone()
        .map(MessageDate::Header)
        .or_else(|| fixed.time(tags::CLIENT_SUBMIT_TIME).map(MessageDate::Timestamp))
        .or_else(|| {
            fixed
                .time(tags::MESSAGE_DELIVERY_TIME)
                .map(MessageDate::Timestamp)
        });

    let body = storage.string(tags::BODY)?;
    let html_body = match storage.binary(tags::HTML)? {
        Some(bytes) => Some(bytes),
        None => match storage.string(tags::HTML)? {
            Some(html) => Some(html.into_bytes()),
            None => html_from_compressed_rtf(&mut storage)?,
        },
    };

    let attachments = read_attachments(&mut storage)?;

    debug!(
        subject = subject.as_deref().unwrap_or(""),
        attachments = attachments.len(),
        has_html = html_body.is_some(),
        "Parsed message"
    );

    Ok(ParsedMessage {
        subject,
        sender,
        to,
        cc,
        date,
        body,
        html_body,
        attachments,
    })
}

/// HTML encapsulated in `PR_RTF_COMPRESSED`. A stream that cannot be
/// decompressed is logged and treated as absent.
fn html_from_compressed_rtf<F: Read + Seek>(
    storage: &mut PropertyStorage<'_, F>,
) -> std::io::Result<Option<Vec<u8>>> {
    let Some(stream) = storage.binary(tags::RTF_COMPRESSED)? else {
        return Ok(None);
    };
    match rtf::decompress(&stream) {
        Ok(raw) => {
            let html = rtf::html_from_rtf(&raw);
            debug!(
                rtf_len = raw.len(),
                has_html = html.is_some(),
                "Decompressed RTF body"
            );
            Ok(html.map(String::into_bytes))
        }
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable compressed RTF body");
            Ok(None)
        }
    }
}

/// `Name <address>` from the sender properties, or the sent-representing name.
fn sender_from_properties<F: Read + Seek>(
    storage: &mut PropertyStorage<'_, F>,
) -> std::io::Result<Option<String>> {
    let name = storage.string(tags::SENDER_NAME)?;
    let is_exchange = storage
        .string(tags::SENDER_ADDRTYPE)?
        .is_some_and(|t| t.eq_ignore_ascii_case("EX"));

    let mut email = storage.string(tags::SENDER_SMTP_ADDRESS)?;
    if email.is_none() && !is_exchange {
        email = storage.string(tags::SENDER_EMAIL_ADDRESS)?;
    }

    let formatted = format_mailbox(name, email);
    match formatted {
        Some(sender) => Ok(Some(sender)),
        None => storage.string(tags::SENT_REPRESENTING_NAME),
    }
}

fn format_mailbox(name: Option<String>, email: Option<String>) -> Option<String> {
    match (name, email) {
        (Some(name), Some(email)) if name != email => Some(format!("{name} <{email}>")),
        (_, Some(email)) => Some(email),
        (Some(name), None) => Some(name),
        (None, None) => None,
    }
}

/// Read the recipient table into `(to, cc)` display strings joined with `; `.
fn read_recipients<F: Read + Seek>(
    storage: &mut PropertyStorage<'_, F>,
) -> std::io::Result<(Option<String>, Option<String>)> {
    let mut to = Vec::new();
    let mut cc = Vec::new();

    for path in storage.child_storages(RECIPIENT_PREFIX)? {
        let mut recip = storage.child(&path);
        let fixed = recip.fixed(StorageKind::Child)?;
        let name = recip.string(tags::DISPLAY_NAME)?;
        let is_exchange = recip
            .string(tags::ADDRTYPE)?
            .is_some_and(|t| t.eq_ignore_ascii_case("EX"));
        let mut email = recip.string(tags::SMTP_ADDRESS)?;
        if email.is_none() && !is_exchange {
            email = recip.string(tags::EMAIL_ADDRESS)?;
        }

        let Some(entry) = format_mailbox(name, email) else {
            continue;
        };
        match fixed.long(tags::RECIPIENT_TYPE).unwrap_or(MAPI_TO) {
            MAPI_TO => to.push(entry),
            MAPI_CC => cc.push(entry),
            _ => {}
        }
    }

    let join = |list: Vec<String>| (!list.is_empty()).then(|| list.join("; "));
    Ok((join(to), join(cc)))
}

/// Read every attachment storage in name order.
fn read_attachments<F: Read + Seek>(
    storage: &mut PropertyStorage<'_, F>,
) -> std::io::Result<Vec<AttachmentRecord>> {
    let mut attachments = Vec::new();

    for (idx, path) in storage.child_storages(ATTACHMENT_PREFIX)?.into_iter().enumerate() {
        let mut attach = storage.child(&path);
        let filename = attach
            .string(tags::ATTACH_LONG_FILENAME)?
            .or(attach.string(tags::ATTACH_FILENAME)?)
            .or(attach.string(tags::DISPLAY_NAME)?)
            .unwrap_or_else(|| format!("attachment_{idx}"));

        let data = match attach.binary(tags::ATTACH_DATA) {
            Ok(data) => data,
            Err(e) => {
                warn!(filename = %filename, error = %e, "Unreadable attachment data");
                None
            }
        };

        attachments.push(AttachmentRecord {
            content_id: attach.string(tags::ATTACH_CONTENT_ID)?,
            mime_tag: attach.string(tags::ATTACH_MIME_TAG)?,
            filename,
            data,
        });
    }

    Ok(attachments)
}
