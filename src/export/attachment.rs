//! Write a message's attachments to the scratch directory.

use tracing::{debug, warn};

use crate::error::{MsgReaderError, Result};
use crate::model::attachment::{ContentIdMap, SavedAttachment};
use crate::model::message::AttachmentRecord;
use crate::scratch::{safe_filename, ScratchDirectory};

/// Attachments written for one message, and the content-ids they carry.
#[derive(Debug, Default)]
pub struct Materialized {
    /// Successfully written attachments, in message order.
    pub saved: Vec<SavedAttachment>,
    /// `cid` → scratch path, for inline images.
    pub content_ids: ContentIdMap,
}

/// Write a single attachment. The filename is sanitized and made unique.
pub fn materialize_attachment(
    attachment: &AttachmentRecord,
    index: usize,
    scratch: &ScratchDirectory,
) -> Result<SavedAttachment> {
    let data = attachment
        .data
        .as_deref()
        .ok_or_else(|| MsgReaderError::MissingPayload(attachment.filename.clone()))?;

    let filename =
        safe_filename(&attachment.filename).unwrap_or_else(|| format!("attachment_{index}"));
    let path = scratch.write_unique(&filename, data)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(filename);

    Ok(SavedAttachment {
        filename,
        path,
        size: data.len() as u64,
    })
}

/// Write every attachment, skipping the ones that fail.
///
/// A failed attachment is logged and left out of the result; its siblings
/// are still written.
pub fn materialize_attachments(
    attachments: &[AttachmentRecord],
    scratch: &ScratchDirectory,
) -> Materialized {
    let mut result = Materialized::default();

    for (index, attachment) in attachments.iter().enumerate() {
        match materialize_attachment(attachment, index, scratch) {
            Ok(saved) => {
                if let Some(cid) = attachment.content_id.as_deref() {
                    result.content_ids.insert(cid, saved.path.clone());
                }
                debug!(filename = %saved.filename, size = saved.size, "Saved attachment");
                result.saved.push(saved);
            }
            Err(e) => {
                warn!(
                    filename = %attachment.filename,
                    error = %e,
                    "Skipping attachment"
                );
            }
        }
    }

    result
}
