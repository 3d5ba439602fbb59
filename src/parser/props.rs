//! MAPI property access inside an Outlook compound file.
//!
//! Variable-length properties live in their own streams named
//! `__substg1.0_IIIITTTT` (id, type). Fixed-length ones are packed into the
//! storage's `__properties_version1.0` stream as 16-byte records after a
//! header whose size depends on the storage kind.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use cfb::CompoundFile;
use chrono::{DateTime, TimeZone, Utc};
use encoding_rs::Encoding;
use tracing::debug;

/// 32-bit integer.
pub const PT_LONG: u16 = 0x0003;
/// 8-bit string in the message code page.
pub const PT_STRING8: u16 = 0x001E;
/// UTF-16LE string.
pub const PT_UNICODE: u16 = 0x001F;
/// FILETIME.
pub const PT_SYSTIME: u16 = 0x0040;
/// Raw bytes.
pub const PT_BINARY: u16 = 0x0102;

/// Name of the fixed-length property stream in every storage.
pub const PROPERTIES_STREAM: &str = "__properties_version1.0";

/// Property ids used by the reader.
pub mod tags {
    pub const SUBJECT: u16 = 0x0037;
    pub const CLIENT_SUBMIT_TIME: u16 = 0x0039;
    pub const SENT_REPRESENTING_NAME: u16 = 0x0042;
    pub const TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;
    pub const RECIPIENT_TYPE: u16 = 0x0C15;
    pub const SENDER_NAME: u16 = 0x0C1A;
    pub const SENDER_ADDRTYPE: u16 = 0x0C1E;
    pub const SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
    pub const DISPLAY_CC: u16 = 0x0E03;
    pub const DISPLAY_TO: u16 = 0x0E04;
    pub const MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
    pub const BODY: u16 = 0x1000;
    pub const RTF_COMPRESSED: u16 = 0x1009;
    pub const HTML: u16 = 0x1013;
    pub const DISPLAY_NAME: u16 = 0x3001;
    pub const ADDRTYPE: u16 = 0x3002;
    pub const EMAIL_ADDRESS: u16 = 0x3003;
    pub const ATTACH_DATA: u16 = 0x3701;
    pub const ATTACH_FILENAME: u16 = 0x3704;
    pub const ATTACH_LONG_FILENAME: u16 = 0x3707;
    pub const ATTACH_MIME_TAG: u16 = 0x370E;
    pub const ATTACH_CONTENT_ID: u16 = 0x3712;
    pub const SMTP_ADDRESS: u16 = 0x39FE;
    pub const INTERNET_CPID: u16 = 0x3FDE;
    pub const MESSAGE_CODEPAGE: u16 = 0x3FFD;
    pub const SENDER_SMTP_ADDRESS: u16 = 0x5D01;
}

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Size of one fixed property record.
const PROPERTY_RECORD_LEN: usize = 16;

/// Which kind of storage a property stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// The root of a `.msg` file.
    Message,
    /// An attachment or recipient storage.
    Child,
}

impl StorageKind {
    /// Length of the header preceding the property records.
    pub fn header_len(self) -> usize {
        match self {
            Self::Message => 32,
            Self::Child => 8,
        }
    }
}

/// Name of the stream holding a variable-length property.
pub fn stream_name(id: u16, prop_type: u16) -> String {
    format!("__substg1.0_{id:04X}{prop_type:04X}")
}

/// Fixed-length properties of one storage, keyed by property id.
#[derive(Debug, Default)]
pub struct FixedProperties {
    values: HashMap<u16, (u16, [u8; 8])>,
}

impl FixedProperties {
    /// Decode a `__properties_version1.0` stream. Truncated trailing records are ignored.
    pub fn parse(data: &[u8], kind: StorageKind) -> Self {
        let mut values = HashMap::new();
        let records = data.get(kind.header_len()..).unwrap_or(&[]);

        for record in records.chunks_exact(PROPERTY_RECORD_LEN) {
            let mut cursor = Cursor::new(record);
            let (Ok(tag), Ok(_flags)) = (
                cursor.read_u32::<LittleEndian>(),
                cursor.read_u32::<LittleEndian>(),
            ) else {
                continue;
            };
            let mut value = [0u8; 8];
            if cursor.read_exact(&mut value).is_err() {
                continue;
            }
            let id = (tag >> 16) as u16;
            let prop_type = (tag & 0xFFFF) as u16;
            values.insert(id, (prop_type, value));
        }

        Self { values }
    }

    /// A `PT_LONG` value.
    pub fn long(&self, id: u16) -> Option<u32> {
        match self.values.get(&id) {
            Some((PT_LONG, value)) => Cursor::new(&value[..4]).read_u32::<LittleEndian>().ok(),
            _ => None,
        }
    }

    /// A `PT_SYSTIME` value.
    pub fn time(&self, id: u16) -> Option<DateTime<Utc>> {
        match self.values.get(&id) {
            Some((PT_SYSTIME, value)) => {
                let ft = Cursor::new(&value[..]).read_u64::<LittleEndian>().ok()?;
                filetime_to_utc(ft)
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Convert a Windows FILETIME (100 ns ticks since 1601) to UTC. Zero means unset.
pub fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / 10_000_000) as i64 - FILETIME_UNIX_OFFSET_SECS;
    let nanos = ((filetime % 10_000_000) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Map a Windows code page number to an encoding, defaulting to windows-1252.
pub fn codepage_encoding(codepage: u32) -> &'static Encoding {
    let label = match codepage {
        65001 => "utf-8",
        874 => "windows-874",
        932 => "shift_jis",
        936 => "gbk",
        949 => "euc-kr",
        950 => "big5",
        1250..=1258 => return windows_codepage(codepage),
        20866 => "koi8-r",
        21866 => "koi8-u",
        28591 => "iso-8859-1",
        28592 => "iso-8859-2",
        28595 => "iso-8859-5",
        28597 => "iso-8859-7",
        28599 => "iso-8859-9",
        28605 => "iso-8859-15",
        50220 | 50221 | 50222 => "iso-2022-jp",
        51932 => "euc-jp",
        54936 => "gb18030",
        _ => "windows-1252",
    };
    Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
}

fn windows_codepage(codepage: u32) -> &'static Encoding {
    let label = format!("windows-{codepage}");
    Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Decode a `PT_UNICODE` payload, dropping trailing NULs.
pub fn decode_unicode(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Decode a `PT_STRING8` payload, dropping trailing NULs.
pub fn decode_string8(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Reads properties from one storage of a compound file.
pub struct PropertyStorage<'a, F> {
    file: &'a mut CompoundFile<F>,
    path: PathBuf,
    encoding: &'static Encoding,
}

impl<'a, F: Read + Seek> PropertyStorage<'a, F> {
    pub fn new(file: &'a mut CompoundFile<F>, path: impl AsRef<Path>, encoding: &'static Encoding) -> Self {
        Self {
            file,
            path: path.as_ref().to_path_buf(),
            encoding,
        }
    }

    /// Path of this storage inside the compound file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Change the code page used for `PT_STRING8` values.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    /// Raw bytes of a stream in this storage, or `None` if it does not exist.
    pub fn raw_stream(&mut self, name: &str) -> std::io::Result<Option<Vec<u8>>> {
        let stream_path = self.path.join(name);
        if !self.file.is_stream(&stream_path) {
            return Ok(None);
        }
        let mut stream = self.file.open_stream(&stream_path)?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        debug!(stream = %stream_path.display(), len = buf.len(), "Read property stream");
        Ok(Some(buf))
    }

    /// A string property, preferring the Unicode form. Empty strings read as `None`.
    pub fn string(&mut self, id: u16) -> std::io::Result<Option<String>> {
        let text = match self.raw_stream(&stream_name(id, PT_UNICODE))? {
            Some(bytes) => Some(decode_unicode(&bytes)),
            None => self
                .raw_stream(&stream_name(id, PT_STRING8))?
                .map(|bytes| decode_string8(&bytes, self.encoding)),
        };
        Ok(text.filter(|s| !s.trim().is_empty()))
    }

    /// A binary property.
    pub fn binary(&mut self, id: u16) -> std::io::Result<Option<Vec<u8>>> {
        self.raw_stream(&stream_name(id, PT_BINARY))
    }

    /// The fixed-length properties of this storage. Missing stream reads as empty.
    pub fn fixed(&mut self, kind: StorageKind) -> std::io::Result<FixedProperties> {
        Ok(self
            .raw_stream(PROPERTIES_STREAM)?
            .map(|data| FixedProperties::parse(&data, kind))
            .unwrap_or_default())
    }

    /// Names of child storages whose name starts with `prefix`, sorted.
    pub fn child_storages(&self, prefix: &str) -> std::io::Result<Vec<PathBuf>> {
        let mut children: Vec<PathBuf> = self
            .file
            .read_storage(&self.path)?
            .filter(|entry| entry.is_storage() && entry.name().starts_with(prefix))
            .map(|entry| entry.path().to_path_buf())
            .collect();
        children.sort();
        Ok(children)
    }

    /// A reader for a child storage sharing this file and code page.
    pub fn child(&mut self, path: impl AsRef<Path>) -> PropertyStorage<'_, F> {
        PropertyStorage {
            file: &mut *self.file,
            path: path.as_ref().to_path_buf(),
            encoding: self.encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn record(id: u16, prop_type: u16, value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(((id as u32) << 16) | prop_type as u32)
            .unwrap();
        buf.write_u32::<LittleEndian>(0x6).unwrap();
        buf.write_u64::<LittleEndian>(value).unwrap();
        buf
    }

    #[test]
    fn test_stream_name() {
        assert_eq!(stream_name(0x0037, PT_UNICODE), "__substg1.0_0037001F");
        assert_eq!(stream_name(0x1013, PT_BINARY), "__substg1.0_10130102");
    }

    #[test]
    fn test_filetime_conversion() {
        // 2024-01-08T10:00:00Z
        let ts = Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap();
        let ft = ((ts.timestamp() + FILETIME_UNIX_OFFSET_SECS) as u64) * 10_000_000;
        assert_eq!(filetime_to_utc(ft), Some(ts));
        assert_eq!(filetime_to_utc(0), None);
    }

    #[test]
    fn test_fixed_properties_top_level_header() {
        let mut data = vec![0u8; 32];
        data.extend(record(tags::INTERNET_CPID, PT_LONG, 65001));
        data.extend(record(tags::CLIENT_SUBMIT_TIME, PT_SYSTIME, 133_492_536_000_000_000));
        let props = FixedProperties::parse(&data, StorageKind::Message);
        assert_eq!(props.len(), 2);
        assert_eq!(props.long(tags::INTERNET_CPID), Some(65001));
        assert!(props.time(tags::CLIENT_SUBMIT_TIME).is_some());
    }

    #[test]
    fn test_fixed_properties_type_mismatch() {
        let mut data = vec![0u8; 8];
        data.extend(record(tags::RECIPIENT_TYPE, PT_SYSTIME, 1));
        let props = FixedProperties::parse(&data, StorageKind::Child);
        assert_eq!(props.long(tags::RECIPIENT_TYPE), None);
    }

    #[test]
    fn test_fixed_properties_truncated() {
        let mut data = vec![0u8; 8];
        data.extend(record(tags::RECIPIENT_TYPE, PT_LONG, 2));
        data.extend([0u8; 7]);
        let props = FixedProperties::parse(&data, StorageKind::Child);
        assert_eq!(props.long(tags::RECIPIENT_TYPE), Some(2));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_decode_unicode_trims_nul() {
        let bytes: Vec<u8> = "Caf\u{e9}\0"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(decode_unicode(&bytes), "Caf\u{e9}");
    }

    #[test]
    fn test_decode_string8_with_codepage() {
        let enc = codepage_encoding(1252);
        assert_eq!(decode_string8(b"R\xe9sum\xe9", enc), "R\u{e9}sum\u{e9}");
        let cyrillic = codepage_encoding(1251);
        assert_eq!(decode_string8(b"\xcf\xf0\xe8", cyrillic), "\u{41f}\u{440}\u{438}");
    }

    #[test]
    fn test_unknown_codepage_defaults_to_1252() {
        assert_eq!(codepage_encoding(12345), encoding_rs::WINDOWS_1252);
        assert_eq!(codepage_encoding(65001), encoding_rs::UTF_8);
    }
}
