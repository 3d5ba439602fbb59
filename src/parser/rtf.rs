//! HTML recovered from `PR_RTF_COMPRESSED`.
//!
//! Outlook sometimes stores an HTML message only as compressed RTF with the
//! HTML encapsulated in it (`\fromhtml1`). [`decompress`] undoes the LZFu
//! compression and [`html_from_rtf`] strips the RTF wrapping back off.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding_rs::Encoding;
use thiserror::Error;

use crate::parser::props::codepage_encoding;

/// `LZFu`, a compressed stream.
const COMPRESSED: u32 = 0x7546_5A4C;
/// `MELA`, a stored stream.
const UNCOMPRESSED: u32 = 0x414C_454D;

const HEADER_LEN: usize = 16;
const DICTIONARY_LEN: usize = 4096;

/// Initial contents of the LZFu dictionary.
const DICTIONARY_PRELOAD: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \
\\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\
\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

/// Why a compressed RTF stream could not be read.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RtfError {
    #[error("compressed RTF header is truncated")]
    Truncated,
    #[error("unknown compressed RTF type {0:#010x}")]
    UnknownType(u32),
    #[error("compressed RTF checksum mismatch")]
    Checksum,
}

/// Decompress a `PR_RTF_COMPRESSED` stream into raw RTF bytes.
pub fn decompress(stream: &[u8]) -> Result<Vec<u8>, RtfError> {
    if stream.len() < HEADER_LEN {
        return Err(RtfError::Truncated);
    }
    let comp_size = LittleEndian::read_u32(&stream[0..4]) as usize;
    let raw_size = LittleEndian::read_u32(&stream[4..8]) as usize;
    let kind = LittleEndian::read_u32(&stream[8..12]);
    let crc = LittleEndian::read_u32(&stream[12..16]);

    // the size field counts everything after itself
    let end = comp_size.saturating_add(4).clamp(HEADER_LEN, stream.len());
    let data = &stream[HEADER_LEN..end];

    match kind {
        UNCOMPRESSED => Ok(data[..raw_size.min(data.len())].to_vec()),
        COMPRESSED => {
            if checksum(data) != crc {
                return Err(RtfError::Checksum);
            }
            Ok(lzfu(data, raw_size))
        }
        other => Err(RtfError::UnknownType(other)),
    }
}

/// CRC-32 without the final inversion, seeded with zero.
fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(u32::MAX);
    hasher.update(data);
    !hasher.finalize()
}

fn lzfu(data: &[u8], raw_size: usize) -> Vec<u8> {
    let mut dictionary = [0u8; DICTIONARY_LEN];
    dictionary[..DICTIONARY_PRELOAD.len()].copy_from_slice(DICTIONARY_PRELOAD);
    let mut write = DICTIONARY_PRELOAD.len();
    let mut out = Vec::with_capacity(raw_size);

    let mut pos = 0;
    'runs: while let Some(&control) = data.get(pos) {
        pos += 1;
        for bit in 0..8 {
            if control & (1 << bit) == 0 {
                let Some(&byte) = data.get(pos) else {
                    break 'runs;
                };
                pos += 1;
                out.push(byte);
                dictionary[write] = byte;
                write = (write + 1) % DICTIONARY_LEN;
                continue;
            }

            let Some(reference) = data.get(pos..pos + 2) else {
                break 'runs;
            };
            pos += 2;
            let reference = BigEndian::read_u16(reference);
            let offset = usize::from(reference >> 4);
            let len = usize::from(reference & 0x0F) + 2;
            if offset == write {
                break 'runs;
            }
            for i in 0..len {
                let byte = dictionary[(offset + i) % DICTIONARY_LEN];
                out.push(byte);
                dictionary[write] = byte;
                write = (write + 1) % DICTIONARY_LEN;
            }
        }
    }

    out.truncate(raw_size);
    out
}

/// Extract the HTML encapsulated in `rtf`, or `None` if the document was
/// not generated from HTML.
pub fn html_from_rtf(rtf: &[u8]) -> Option<String> {
    let header = &rtf[..rtf.len().min(1024)];
    if !header.windows(10).any(|w| w == b"\\fromhtml1") {
        return None;
    }
    Some(Decapsulator::new(rtf).run())
}

#[derive(Debug, Clone, Copy, Default)]
struct Group {
    /// Inside a destination that produces no HTML.
    skip: bool,
    /// Inside `{\*\htmltag...}`: always emitted.
    tag: bool,
    /// Between `\htmlrtf` and `\htmlrtf0`: RTF-only text.
    rtf_only: bool,
    /// Characters to skip after `\uN`.
    uc: usize,
}

struct Decapsulator<'a> {
    input: &'a [u8],
    pos: usize,
    groups: Vec<Group>,
    current: Group,
    encoding: &'static Encoding,
    pending: Vec<u8>,
    out: String,
    skip_chars: usize,
    /// Set after `{\*`: the next control word names an optional destination.
    optional: bool,
    /// Set after `{`: the next control word may name a destination.
    group_start: bool,
}

impl<'a> Decapsulator<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            groups: Vec::new(),
            current: Group {
                uc: 1,
                ..Group::default()
            },
            encoding: encoding_rs::WINDOWS_1252,
            pending: Vec::new(),
            out: String::new(),
            skip_chars: 0,
            optional: false,
            group_start: false,
        }
    }

    fn visible(&self) -> bool {
        !self.current.skip && (self.current.tag || !self.current.rtf_only)
    }

    fn run(mut self) -> String {
        while let Some(&byte) = self.input.get(self.pos) {
            self.pos += 1;
            match byte {
                b'{' => {
                    self.groups.push(self.current);
                    self.group_start = true;
                    self.optional = false;
                    continue;
                }
                b'}' => {
                    self.flush();
                    if let Some(parent) = self.groups.pop() {
                        self.current = parent;
                    }
                }
                b'\\' => {
                    self.control();
                    continue;
                }
                b'\r' | b'\n' => continue,
                _ => self.text(byte),
            }
            self.group_start = false;
        }
        self.flush();
        self.out
    }

    fn text(&mut self, byte: u8) {
        if self.skip_chars > 0 {
            self.skip_chars -= 1;
            return;
        }
        if self.visible() {
            self.pending.push(byte);
        }
    }

    fn emit(&mut self, s: &str) {
        if self.visible() {
            self.flush();
            self.out.push_str(s);
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let (text, _) = self.encoding.decode_without_bom_handling(&self.pending);
            self.out.push_str(&text);
            self.pending.clear();
        }
    }

    fn control(&mut self) {
        let Some(&first) = self.input.get(self.pos) else {
            return;
        };
        self.pos += 1;

        if !first.is_ascii_alphabetic() {
            if first == b'*' {
                self.optional = true;
                return;
            }
            self.group_start = false;
            match first {
                b'\'' => {
                    let hex = self
                        .input
                        .get(self.pos..self.pos + 2)
                        .and_then(|h| std::str::from_utf8(h).ok())
                        .and_then(|h| u8::from_str_radix(h, 16).ok());
                    if let Some(byte) = hex {
                        self.pos += 2;
                        self.text(byte);
                    }
                }
                b'~' => self.emit("\u{a0}"),
                b'_' => self.emit("-"),
                b'\r' | b'\n' => self.emit("\r\n"),
                other => self.text(other),
            }
            return;
        }

        let start = self.pos - 1;
        while self.input.get(self.pos).is_some_and(u8::is_ascii_alphabetic) {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];

        let digits_start = self.pos;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        while self.input.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let param = std::str::from_utf8(&self.input[digits_start..self.pos])
            .ok()
            .and_then(|p| p.parse::<i32>().ok());
        if self.input.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }

        let destination = std::mem::take(&mut self.group_start);
        let optional = std::mem::take(&mut self.optional);
        self.word(word, param, destination, optional);
    }

    fn word(&mut self, word: &[u8], param: Option<i32>, destination: bool, optional: bool) {
        if destination && optional {
            self.flush();
            match word {
                b"htmltag" => self.current.tag = true,
                _ => self.current.skip = true,
            }
            return;
        }

        match word {
            b"fonttbl" | b"colortbl" | b"stylesheet" | b"info" | b"pict" if destination => {
                self.current.skip = true;
            }
            b"htmlrtf" => {
                self.flush();
                self.current.rtf_only = param != Some(0);
            }
            b"ansicpg" => {
                if let Some(cp) = param.and_then(|p| u32::try_from(p).ok()) {
                    self.flush();
                    self.encoding = codepage_encoding(cp);
                }
            }
            b"uc" => self.current.uc = param.and_then(|p| usize::try_from(p).ok()).unwrap_or(1),
            b"u" => {
                if let Some(code) = param {
                    // negative values are UTF-16 units written as signed 16-bit
                    let unit = code as u16;
                    let ch = char::from_u32(u32::from(unit)).unwrap_or('\u{fffd}');
                    self.emit(ch.encode_utf8(&mut [0u8; 4]));
                    self.skip_chars = self.current.uc;
                }
            }
            b"par" | b"line" => self.emit("\r\n"),
            b"tab" => self.emit("\t"),
            b"lquote" => self.emit("\u{2018}"),
            b"rquote" => self.emit("\u{2019}"),
            b"ldblquote" => self.emit("\u{201c}"),
            b"rdblquote" => self.emit("\u{201d}"),
            b"bullet" => self.emit("\u{2022}"),
            b"endash" => self.emit("\u{2013}"),
            b"emdash" => self.emit("\u{2014}"),
            _ => {}
        }
    }
}
