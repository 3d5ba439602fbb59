//! Centralized error types for msgreader.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::i18n;

/// All errors produced by the msgreader library.
#[derive(Error, Debug)]
pub enum MsgReaderError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A load request arrived without a file.
    #[error("No file received")]
    NoFileReceived,

    /// A load request carried a file with an empty name.
    #[error("No file selected")]
    NoFileSelected,

    /// The uploaded file does not have the `.msg` extension.
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    /// The file is not a readable Outlook message.
    #[error("Invalid or corrupt .msg file '{path}': {reason}")]
    InvalidMessage { path: PathBuf, reason: String },

    /// An attachment has no binary payload to write.
    #[error("Attachment '{0}' has no readable content")]
    MissingPayload(String),

    /// The HTML body could not be rewritten.
    #[error("Body rendering failed: {0}")]
    BodyRender(String),

    /// The source `.msg` of the current session no longer exists.
    #[error("Original .msg file not found: {0}")]
    SourceMissing(PathBuf),

    /// Building or writing the `.eml` document failed.
    #[error("Export error: {0}")]
    Export(String),

    /// The OS could not launch a handler for the target.
    #[error("Could not open '{target}': {source}")]
    Launch {
        target: String,
        source: std::io::Error,
    },

    /// The external link uses a scheme that is not allowed.
    #[error("External link not allowed: {0}")]
    LinkRejected(String),

    /// A filename sanitized to nothing.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// The requested attachment is not in the scratch directory.
    #[error("File not found: {0}")]
    AttachmentNotFound(String),

    /// A command needs a loaded message but none is loaded.
    #[error("No message loaded")]
    NoMessageLoaded,

    /// The scratch path holds files msgreader did not create.
    #[error("Refusing to clear '{0}': not a msgreader scratch directory")]
    ScratchNotOwned(PathBuf),

    /// A protocol line could not be decoded into a command.
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

/// Convenience alias for `Result<T, MsgReaderError>`.
pub type Result<T> = std::result::Result<T, MsgReaderError>;

/// Coarse error classes reported across the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, unnamed, or wrongly typed upload.
    InvalidUpload,
    /// Unparsable or corrupt source message.
    InvalidMessage,
    /// Per-attachment read or write failure.
    Attachment,
    /// Body could not be rendered.
    BodyRender,
    /// Export failed.
    Export,
    /// The OS handler could not be launched.
    Launch,
    /// External link scheme not allowed.
    LinkRejected,
    /// Requested item does not exist.
    NotFound,
    /// Any other file-system failure.
    Io,
    /// Undecodable command.
    BadRequest,
}

impl MsgReaderError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidMessage` variant from a path and any displayable reason.
    pub fn invalid_message(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidMessage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// The boundary class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFileReceived | Self::NoFileSelected | Self::InvalidFileType(_) => {
                ErrorKind::InvalidUpload
            }
            Self::InvalidMessage { .. } => ErrorKind::InvalidMessage,
            Self::MissingPayload(_) => ErrorKind::Attachment,
            Self::BodyRender(_) => ErrorKind::BodyRender,
            Self::SourceMissing(_) | Self::Export(_) => ErrorKind::Export,
            Self::Launch { .. } => ErrorKind::Launch,
            Self::LinkRejected(_) => ErrorKind::LinkRejected,
            Self::InvalidFilename(_) | Self::AttachmentNotFound(_) | Self::NoMessageLoaded => {
                ErrorKind::NotFound
            }
            Self::Io { .. } | Self::ScratchNotOwned(_) => ErrorKind::Io,
            Self::BadRequest(_) => ErrorKind::BadRequest,
        }
    }

    /// Localized, human-readable message for the presentation shell.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFileReceived => i18n::err_no_file_received().to_string(),
            Self::NoFileSelected => i18n::err_no_file_selected().to_string(),
            Self::InvalidFileType(_) => i18n::err_invalid_file_type().to_string(),
            Self::InvalidMessage { reason, .. } => {
                format!("{} {reason}", i18n::err_invalid_message())
            }
            Self::MissingPayload(name) => format!("{}: {name}", i18n::err_attachment_unreadable()),
            Self::BodyRender(reason) => format!("{} {reason}", i18n::err_body_unreadable()),
            Self::SourceMissing(_) => i18n::err_source_missing().to_string(),
            Self::Export(reason) => format!("{} {reason}", i18n::err_export()),
            Self::Launch { source, .. } => format!("{} {source}", i18n::err_launch()),
            Self::LinkRejected(_) => i18n::err_link_rejected().to_string(),
            Self::InvalidFilename(_) => i18n::err_invalid_filename().to_string(),
            Self::AttachmentNotFound(_) => i18n::err_file_not_found().to_string(),
            Self::NoMessageLoaded => i18n::err_no_message_loaded().to_string(),
            Self::Io { path, source } => format!("{} '{}': {source}", i18n::err_io(), path.display()),
            Self::ScratchNotOwned(path) => {
                format!("{} {}", i18n::err_scratch_not_owned(), path.display())
            }
            Self::BadRequest(reason) => format!("{} {reason}", i18n::err_bad_request()),
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MsgReaderError`
/// when no path context is available (rare, prefer `MsgReaderError::io`).
impl From<std::io::Error> for MsgReaderError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
