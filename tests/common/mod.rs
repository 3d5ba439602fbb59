//! Builds small but genuine `.msg` compound files for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

const PT_LONG: u16 = 0x0003;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_SYSTIME: u16 = 0x0040;
const PT_BINARY: u16 = 0x0102;

pub const SUBJECT: u16 = 0x0037;
pub const CLIENT_SUBMIT_TIME: u16 = 0x0039;
pub const TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;
pub const RECIPIENT_TYPE: u16 = 0x0C15;
pub const SENDER_NAME: u16 = 0x0C1A;
pub const SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
pub const DISPLAY_TO: u16 = 0x0E04;
pub const BODY: u16 = 0x1000;
pub const RTF_COMPRESSED: u16 = 0x1009;
pub const HTML: u16 = 0x1013;
pub const DISPLAY_NAME: u16 = 0x3001;
pub const EMAIL_ADDRESS: u16 = 0x3003;
pub const ATTACH_DATA: u16 = 0x3701;
pub const ATTACH_LONG_FILENAME: u16 = 0x3707;
pub const ATTACH_CONTENT_ID: u16 = 0x3712;
pub const INTERNET_CPID: u16 = 0x3FDE;

/// One storage's worth of properties.
#[derive(Default, Clone)]
struct Properties {
    strings: Vec<(u16, String)>,
    string8: Vec<(u16, Vec<u8>)>,
    binaries: Vec<(u16, Vec<u8>)>,
    fixed: Vec<(u16, u16, u64)>,
}

impl Properties {
    fn write<F: std::io::Read + std::io::Write + std::io::Seek>(
        &self,
        file: &mut cfb::CompoundFile<F>,
        dir: &Path,
        header_len: usize,
    ) {
        for (id, value) in &self.strings {
            let bytes: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
            write_stream(file, &dir.join(stream_name(*id, PT_UNICODE)), &bytes);
        }
        for (id, bytes) in &self.string8 {
            write_stream(file, &dir.join(stream_name(*id, PT_STRING8)), bytes);
        }
        for (id, bytes) in &self.binaries {
            write_stream(file, &dir.join(stream_name(*id, PT_BINARY)), bytes);
        }

        let mut props = vec![0u8; header_len];
        for (id, prop_type, value) in &self.fixed {
            props
                .write_u32::<LittleEndian>((u32::from(*id) << 16) | u32::from(*prop_type))
                .unwrap();
            props.write_u32::<LittleEndian>(0).unwrap();
            props.write_u64::<LittleEndian>(*value).unwrap();
        }
        write_stream(file, &dir.join("__properties_version1.0"), &props);
    }
}

fn stream_name(id: u16, prop_type: u16) -> String {
    format!("__substg1.0_{id:04X}{prop_type:04X}")
}

fn write_stream<F: std::io::Read + std::io::Write + std::io::Seek>(
    file: &mut cfb::CompoundFile<F>,
    path: &Path,
    data: &[u8],
) {
    let mut stream = file.create_stream(path).unwrap();
    stream.write_all(data).unwrap();
    stream.flush().unwrap();
}

/// Fluent builder for a `.msg` file.
#[derive(Default, Clone)]
pub struct MsgBuilder {
    message: Properties,
    recipients: Vec<Properties>,
    attachments: Vec<Properties>,
}

impl MsgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, id: u16, value: &str) -> Self {
        self.message.strings.push((id, value.to_string()));
        self
    }

    pub fn subject(self, subject: &str) -> Self {
        self.string(SUBJECT, subject)
    }

    pub fn sender(self, name: &str, email: &str) -> Self {
        self.string(SENDER_NAME, name).string(SENDER_EMAIL_ADDRESS, email)
    }

    pub fn body(self, body: &str) -> Self {
        self.string(BODY, body)
    }

    pub fn html(mut self, html: &str) -> Self {
        self.message.binaries.push((HTML, html.as_bytes().to_vec()));
        self
    }

    pub fn binary(mut self, id: u16, bytes: &[u8]) -> Self {
        self.message.binaries.push((id, bytes.to_vec()));
        self
    }

    /// RTF stored uncompressed (`MELA`) in `PR_RTF_COMPRESSED`.
    pub fn rtf(mut self, rtf: &str) -> Self {
        let mut stream = Vec::new();
        stream.extend_from_slice(&(rtf.len() as u32 + 12).to_le_bytes());
        stream.extend_from_slice(&(rtf.len() as u32).to_le_bytes());
        stream.extend_from_slice(b"MELA");
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.extend_from_slice(rtf.as_bytes());
        self.message.binaries.push((RTF_COMPRESSED, stream));
        self
    }

    pub fn transport_headers(self, headers: &str) -> Self {
        self.string(TRANSPORT_MESSAGE_HEADERS, headers)
    }

    /// An 8-bit string property together with the code page it is encoded in.
    pub fn string8(mut self, id: u16, bytes: &[u8], codepage: u32) -> Self {
        self.message.string8.push((id, bytes.to_vec()));
        self.message
            .fixed
            .push((INTERNET_CPID, PT_LONG, u64::from(codepage)));
        self
    }

    /// Client submit time as a Windows FILETIME.
    pub fn submit_time(mut self, filetime: u64) -> Self {
        self.message
            .fixed
            .push((CLIENT_SUBMIT_TIME, PT_SYSTIME, filetime));
        self
    }

    /// A recipient-table row; `kind` is 1 for To and 2 for Cc.
    pub fn recipient(mut self, name: &str, email: &str, kind: u32) -> Self {
        self.recipients.push(Properties {
            strings: vec![
                (DISPLAY_NAME, name.to_string()),
                (EMAIL_ADDRESS, email.to_string()),
            ],
            fixed: vec![(RECIPIENT_TYPE, PT_LONG, u64::from(kind))],
            ..Default::default()
        });
        self
    }

    pub fn attachment(mut self, filename: &str, data: &[u8], content_id: Option<&str>) -> Self {
        let mut strings = vec![(ATTACH_LONG_FILENAME, filename.to_string())];
        if let Some(cid) = content_id {
            strings.push((ATTACH_CONTENT_ID, cid.to_string()));
        }
        self.attachments.push(Properties {
            strings,
            binaries: vec![(ATTACH_DATA, data.to_vec())],
            ..Default::default()
        });
        self
    }

    /// An attachment with no data stream, like an embedded message.
    pub fn attachment_without_data(mut self, filename: &str) -> Self {
        self.attachments.push(Properties {
            strings: vec![(ATTACH_LONG_FILENAME, filename.to_string())],
            ..Default::default()
        });
        self
    }

    /// Write the compound file to `path`.
    pub fn write(&self, path: &Path) {
        let mut file = cfb::create(path).unwrap();
        let root = Path::new("/");
        self.message.write(&mut file, root, 32);

        for (i, recip) in self.recipients.iter().enumerate() {
            let dir = root.join(format!("__recip_version1.0_#{i:08X}"));
            file.create_storage(&dir).unwrap();
            recip.write(&mut file, &dir, 8);
        }
        for (i, attach) in self.attachments.iter().enumerate() {
            let dir = root.join(format!("__attach_version1.0_#{i:08X}"));
            file.create_storage(&dir).unwrap();
            attach.write(&mut file, &dir, 8);
        }
        file.flush().unwrap();
    }

    /// Write to `dir/name` and return the full path.
    pub fn write_in(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        self.write(&path);
        path
    }

    /// The file's bytes, as an upload would carry them.
    pub fn to_bytes(&self) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = self.write_in(dir.path(), "fixture.msg");
        std::fs::read(path).unwrap()
    }
}
