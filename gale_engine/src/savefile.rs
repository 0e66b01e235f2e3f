//! Binary save-file primitives.
//!
//! Every save file starts with the 3-byte magic `C0 FF EE` and a format version,
//! and ends with the 2-byte magic `13 51`. Integers are fixed width in native
//! byte order; strings are a `u32` length followed by UTF-8 bytes. Any read
//! past the end of the buffer is an error rather than a short read.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::clock::ClockError;
use crate::room::RoomId;
use crate::wind::WindDirectionError;

pub const HEADER_MAGIC: [u8; 3] = [0xC0, 0xFF, 0xEE];
pub const FOOTER_MAGIC: [u8; 2] = [0x13, 0x51];

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("missing or corrupt save header")]
    BadHeader,
    #[error("missing or corrupt save footer")]
    BadFooter,
    #[error("{kind} save version {found} does not match the current version {expected}")]
    VersionMismatch { kind: &'static str, found: u32, expected: u32 },
    #[error("read of {wanted} bytes at offset {offset} runs past the end of the data ({len} bytes)")]
    OutOfBounds { offset: usize, wanted: usize, len: usize },
    #[error("unknown {kind} value {value}")]
    UnknownDiscriminant { kind: &'static str, value: u32 },
    #[error("string at offset {0} is not valid UTF-8")]
    BadString(usize),
    #[error("expected section {expected:#010x}, found {found:#010x}")]
    BadSection { expected: u32, found: u32 },
    #[error("save data for region {found} cannot be applied to region {expected}")]
    WrongRegion { expected: u32, found: u32 },
    #[error("save data refers to room {0}, which is not in this region")]
    UnknownRoom(RoomId),
    #[error("{0} trailing bytes after the footer")]
    TrailingData(usize),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    Wind(#[from] WindDirectionError),
    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// Append-only buffer for building a save file.
#[derive(Debug, Default)]
pub struct FileWriter {
    buf: Vec<u8>,
}

impl FileWriter {
    /// A writer with the header magic and `version` already written.
    pub fn with_header(version: u32) -> FileWriter {
        let mut writer = FileWriter::default();
        writer.buf.extend_from_slice(&HEADER_MAGIC);
        writer.write_u32(version);
        writer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    /// Write a collection length as a `u32`.
    ///
    /// # Panics
    /// Lengths above `u32::MAX` cannot be represented in the format.
    pub fn write_count(&mut self, count: usize) {
        let count = u32::try_from(count).expect("save record count exceeds u32::MAX");
        self.write_u32(count);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_count(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write the footer and hand back the finished bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(&FOOTER_MAGIC);
        self.buf
    }

    /// Write the footer and store the file at `path`, via a temporary sibling.
    ///
    /// # Errors
    /// - on any filesystem failure
    pub fn finish_to(self, path: &Path) -> Result<(), SaveError> {
        let bytes = self.finish();
        let io_err = |source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }
}

/// Bounds-checked cursor over a save file.
#[derive(Debug)]
pub struct FileReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FileReader<'a> {
    /// Check the header magic and that the format version is exactly `version`.
    ///
    /// # Errors
    /// - on bad magic or any version other than `version`
    pub fn open(data: &'a [u8], kind: &'static str, version: u32) -> Result<FileReader<'a>, SaveError> {
        let mut reader = FileReader { data, pos: 0 };
        let magic = reader.take(HEADER_MAGIC.len()).map_err(|_| SaveError::BadHeader)?;
        if magic != HEADER_MAGIC {
            return Err(SaveError::BadHeader);
        }
        reader.expect_version(kind, version)?;
        Ok(reader)
    }

    fn take(&mut self, wanted: usize) -> Result<&'a [u8], SaveError> {
        let end = self
            .pos
            .checked_add(wanted)
            .filter(|end| *end <= self.data.len())
            .ok_or(SaveError::OutOfBounds {
                offset: self.pos,
                wanted,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SaveError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, SaveError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, SaveError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SaveError::UnknownDiscriminant {
                kind: "bool",
                value: u32::from(other),
            }),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, SaveError> {
        Ok(u16::from_ne_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SaveError> {
        Ok(u32::from_ne_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SaveError> {
        Ok(u64::from_ne_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, SaveError> {
        Ok(f64::from_ne_bytes(self.take_array()?))
    }

    pub fn read_string(&mut self) -> Result<String, SaveError> {
        let len = self.read_u32()? as usize;
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SaveError::BadString(start))
    }

    /// Read a version field and require an exact match.
    ///
    /// # Errors
    /// - if the stored version differs from `expected`
    pub fn expect_version(&mut self, kind: &'static str, expected: u32) -> Result<(), SaveError> {
        let found = self.read_u32()?;
        if found != expected {
            return Err(SaveError::VersionMismatch { kind, found, expected });
        }
        Ok(())
    }

    /// Read a section tag and require it to be `expected`.
    ///
    /// # Errors
    /// - if a different tag is found
    pub fn expect_section(&mut self, expected: u32) -> Result<(), SaveError> {
        let found = self.read_u32()?;
        if found != expected {
            return Err(SaveError::BadSection { expected, found });
        }
        Ok(())
    }

    /// Check the footer magic and that nothing follows it.
    ///
    /// # Errors
    /// - on a missing or wrong footer, or trailing bytes
    pub fn finish(mut self) -> Result<(), SaveError> {
        let magic = self.take(FOOTER_MAGIC.len()).map_err(|_| SaveError::BadFooter)?;
        if magic != FOOTER_MAGIC {
            return Err(SaveError::BadFooter);
        }
        let trailing = self.data.len() - self.pos;
        if trailing > 0 {
            return Err(SaveError::TrailingData(trailing));
        }
        Ok(())
    }
}

/// Read a whole save file into memory.
///
/// # Errors
/// - if the file cannot be read
pub fn read_file(path: &Path) -> Result<Vec<u8>, SaveError> {
    fs::read(path).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })
}
