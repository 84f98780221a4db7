//! Character-encoding normalization for plain-text files.
//!
//! Every decoder produces UTF-8. Invalid UTF-16 sequences are replaced with
//! U+FFFD; UTF-8 input is passed through untouched.

use std::io::{self, Cursor, Read};

use crate::{Error, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const CHUNK_SIZE: usize = 8 * 1024;

/// Supported source encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Look up an encoding by its configured name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "" | "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            other => Err(Error::config(format!(
                "unknown character encoding '{other}', must be one of: utf-8, utf-16le, utf-16be"
            ))),
        }
    }
}

/// Wraps byte readers so their output is UTF-8.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    encoding: Encoding,
}

impl Decoder {
    /// Create a decoder for the named encoding.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown names.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            encoding: Encoding::from_name(name)?,
        })
    }

    /// Wrap a reader so it yields UTF-8.
    #[must_use]
    pub fn wrap<'a>(&self, reader: Box<dyn Read + Send + 'a>) -> Box<dyn Read + Send + 'a> {
        match self.encoding {
            Encoding::Utf8 => reader,
            Encoding::Utf16Le => Box::new(Utf16Reader::new(reader, true)),
            Encoding::Utf16Be => Box::new(Utf16Reader::new(reader, false)),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
        }
    }
}

/// Drop a leading UTF-8 byte-order mark, if present.
///
/// # Errors
///
/// Returns an error if reading the first bytes fails.
pub fn skip_utf8_bom<'a>(
    mut reader: Box<dyn Read + Send + 'a>,
) -> io::Result<Box<dyn Read + Send + 'a>> {
    let mut prefix = [0u8; 3];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    if filled == prefix.len() && prefix == UTF8_BOM {
        return Ok(reader);
    }
    Ok(Box::new(Cursor::new(prefix[..filled].to_vec()).chain(reader)))
}

/// Streaming UTF-16 to UTF-8 transcoder.
struct Utf16Reader<R> {
    inner: R,
    little_endian: bool,
    out: Vec<u8>,
    out_pos: usize,
    odd_byte: Option<u8>,
    high_surrogate: Option<u16>,
    done: bool,
}

impl<R: Read> Utf16Reader<R> {
    fn new(inner: R, little_endian: bool) -> Self {
        Self {
            inner,
            little_endian,
            out: Vec::with_capacity(CHUNK_SIZE * 2),
            out_pos: 0,
            odd_byte: None,
            high_surrogate: None,
            done: false,
        }
    }

    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn push_unit(&mut self, unit: u16) {
        if let Some(high) = self.high_surrogate.take() {
            if (0xDC00..=0xDFFF).contains(&unit) {
                let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                self.push_char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                return;
            }
            self.push_char(char::REPLACEMENT_CHARACTER);
        }

        match unit {
            0xD800..=0xDBFF => self.high_surrogate = Some(unit),
            0xDC00..=0xDFFF => self.push_char(char::REPLACEMENT_CHARACTER),
            _ => self.push_char(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)),
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        self.out.clear();
        self.out_pos = 0;

        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        };

        if n == 0 {
            self.done = true;
            // Dangling byte or unpaired high surrogate at end of input
            if self.odd_byte.take().is_some() || self.high_surrogate.take().is_some() {
                self.push_char(char::REPLACEMENT_CHARACTER);
            }
            return Ok(());
        }

        let mut bytes = chunk[..n].iter().copied();
        let mut first = self.odd_byte.take().or_else(|| bytes.next());
        while let Some(a) = first {
            let Some(b) = bytes.next() else {
                self.odd_byte = Some(a);
                break;
            };
            let unit = if self.little_endian {
                u16::from_le_bytes([a, b])
            } else {
                u16::from_be_bytes([a, b])
            };
            self.push_unit(unit);
            first = bytes.next();
        }
        Ok(())
    }
}

impl<R: Read> Read for Utf16Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out_pos >= self.out.len() {
            if self.done {
                return Ok(0);
            }
            self.fill()?;
        }

        let available = &self.out[self.out_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.out_pos += n;
        Ok(n)
    }
}
