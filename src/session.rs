//! The command boundary between the message pipeline and a display shell.
//!
//! A [`Session`] owns the scratch directory, the launcher and the message
//! currently on screen. Every command returns a typed [`Result`]; the shell
//! sees it as a [`Reply`] tagged `"success"` or `"error"`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{self, Config, SanitizerPolicy};
use crate::error::{ErrorKind, MsgReaderError, Result};
use crate::export::attachment::materialize_attachments;
use crate::export::eml::export_eml;
use crate::launch::{check_link, launch, Launcher, SystemLauncher};
use crate::model::attachment::SavedAttachment;
use crate::parser::msg::parse_msg;
use crate::render::render_body;
use crate::scratch::{safe_filename, ScratchDirectory};

const MSG_EXTENSION: &str = ".msg";

/// A file handed over by the shell: its original name and its bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub contents: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            contents,
        }
    }

    /// Read `path` from disk, keeping its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path).map_err(|e| MsgReaderError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { filename, contents })
    }
}

/// What the shell shows for a loaded message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPayload {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub date: Option<String>,
    /// Sanitized HTML.
    pub body: String,
    /// Saved attachment filenames, in message order.
    pub attachments: Vec<String>,
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedEml {
    pub path: PathBuf,
}

/// The message currently on screen.
#[derive(Debug, Clone)]
pub struct LoadedMessage {
    /// The uploaded `.msg`, saved in the scratch directory.
    pub source: PathBuf,
    pub attachments: Vec<SavedAttachment>,
}

/// Rendering and export behavior of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub sanitizer: SanitizerPolicy,
    pub message_id_domain: String,
    pub open_after_export: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sanitizer: config.render.sanitizer,
            message_id_domain: config.export.message_id_domain.clone(),
            open_after_export: config.export.open_after_export,
        }
    }
}

/// One user's view of one message at a time.
pub struct Session<L: Launcher = SystemLauncher> {
    scratch: ScratchDirectory,
    launcher: L,
    settings: SessionSettings,
    loaded: Option<LoadedMessage>,
}

impl Session<SystemLauncher> {
    /// Session using the configured scratch directory and opener.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ScratchDirectory::new(config::scratch_dir(config)),
            SystemLauncher::new(config.launcher.command.clone()),
            SessionSettings::from_config(config),
        )
    }
}

impl<L: Launcher> Session<L> {
    pub fn new(scratch: ScratchDirectory, launcher: L, settings: SessionSettings) -> Self {
        Self {
            scratch,
            launcher,
            settings,
            loaded: None,
        }
    }

    pub fn scratch(&self) -> &ScratchDirectory {
        &self.scratch
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn loaded(&self) -> Option<&LoadedMessage> {
        self.loaded.as_ref()
    }

    /// Replace the current message with `upload`.
    ///
    /// The upload is validated before anything on disk changes. After that the
    /// scratch directory is emptied, so a parse failure leaves no message loaded.
    pub fn load(&mut self, upload: Option<Upload>) -> Result<DisplayPayload> {
        let upload = upload.ok_or(MsgReaderError::NoFileReceived)?;
        let filename = validate_upload(&upload)?;

        self.loaded = None;
        self.scratch.reset()?;
        let source = self.scratch.write_unique(&filename, &upload.contents)?;

        let message = parse_msg(&source)?;
        let materialized = materialize_attachments(&message.attachments, &self.scratch);
        for (cid, path) in materialized.content_ids.iter() {
            debug!(cid, path = %path.display(), "Inline resource");
        }
        let body = render_body(&message, &materialized.content_ids, self.settings.sanitizer);

        info!(
            source = %source.display(),
            attachments = materialized.saved.len(),
            skipped = message.attachments.len() - materialized.saved.len(),
            "Loaded message"
        );

        let payload = DisplayPayload {
            subject: message.subject,
            from: message.sender,
            to: message.to,
            cc: message.cc,
            date: message.date.map(|d| d.to_string()),
            body,
            attachments: materialized
                .saved
                .iter()
                .map(|a| a.filename.clone())
                .collect(),
        };
        self.loaded = Some(LoadedMessage {
            source,
            attachments: materialized.saved,
        });
        Ok(payload)
    }

    /// Open a file from the scratch directory with its default application.
    pub fn open_attachment(&self, name: &str) -> Result<()> {
        let path = self.scratch.existing_file(name)?;
        launch(&self.launcher, path)
    }

    /// Show the scratch directory in the file manager.
    pub fn reveal_scratch(&self) -> Result<()> {
        self.scratch.ensure()?;
        launch(&self.launcher, self.scratch.path())
    }

    /// Export the loaded message to `.eml`, then open it if configured to.
    pub fn export_to_eml(&self) -> Result<ExportedEml> {
        let loaded = self.loaded.as_ref().ok_or(MsgReaderError::NoMessageLoaded)?;
        let keep: Vec<&Path> = loaded.attachments.iter().map(|a| a.path.as_path()).collect();
        let path = export_eml(
            &loaded.source,
            &self.scratch,
            &self.settings.message_id_domain,
            &keep,
        )?;
        if self.settings.open_after_export {
            launch(&self.launcher, &path)?;
        }
        Ok(ExportedEml { path })
    }

    /// Open an `http`, `https` or `mailto` link in the default handler.
    pub fn open_external_link(&self, url: &str) -> Result<()> {
        check_link(url)?;
        launch(&self.launcher, url)
    }

    /// Run one protocol request and encode the reply as a JSON line.
    pub fn handle(&mut self, request: Request) -> String {
        match request {
            Request::Load { path } => {
                let upload = path.as_deref().map(Upload::from_path).transpose();
                Reply::from(upload.and_then(|u| self.load(u))).to_json()
            }
            Request::OpenAttachment { name } => Reply::from(self.open_attachment(&name)).to_json(),
            Request::Reveal => Reply::from(self.reveal_scratch()).to_json(),
            Request::Export => Reply::from(self.export_to_eml()).to_json(),
            Request::OpenLink { url } => Reply::from(self.open_external_link(&url)).to_json(),
        }
    }

    /// Decode one JSON request line and run it. Malformed lines get an error reply.
    pub fn handle_line(&mut self, line: &str) -> String {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => Reply::<()>::from(Err(MsgReaderError::BadRequest(e.to_string()))).to_json(),
        }
    }
}

/// Check the upload name and return it sanitized for the scratch directory.
fn validate_upload(upload: &Upload) -> Result<String> {
    if upload.filename.trim().is_empty() {
        return Err(MsgReaderError::NoFileSelected);
    }
    if !upload.filename.to_lowercase().ends_with(MSG_EXTENSION) {
        return Err(MsgReaderError::InvalidFileType(upload.filename.clone()));
    }
    safe_filename(&upload.filename)
        .ok_or_else(|| MsgReaderError::InvalidFilename(upload.filename.clone()))
}

/// One command from the shell, as a JSON object tagged by `"command"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// Load the `.msg` at `path`. A missing path is reported as no file received.
    Load {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    OpenAttachment {
        name: String,
    },
    Reveal,
    Export,
    OpenLink {
        url: String,
    },
}

/// What the shell receives for every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply<T> {
    /// The payload's fields sit next to `"status": "success"`.
    Success(T),
    Error { error: ErrorKind, message: String },
}

impl<T> From<Result<T>> for Reply<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Reply::Success(value),
            Err(e) => {
                warn!(error = %e, "Command failed");
                Reply::Error {
                    error: e.kind(),
                    message: e.user_message(),
                }
            }
        }
    }
}

impl<T: Serialize> Reply<T> {
    /// Single-line JSON encoding.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error": ErrorKind::Io,
                "message": e.to_string(),
            })
            .to_string()
        })
    }
}
