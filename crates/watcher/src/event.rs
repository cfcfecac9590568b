//! Inotify event records and the packed-buffer decoder
//!
//! A single `read` on an inotify descriptor returns zero or more records laid
//! out back to back:
//!
//! ```text
//! +--------+--------+--------+--------+----------------------+
//! | wd i32 | mask   | cookie | len    | name[len] (NUL pad)  |
//! +--------+--------+--------+--------+----------------------+
//! ```
//!
//! All header fields are native endian. The next record begins right after
//! the `len` name bytes.

use bitflags::bitflags;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use thiserror::Error;

/// Size of the fixed record header: wd, mask, cookie, len
pub const HEADER_SIZE: usize = 16;

/// Longest file name the kernel reports in a record
pub const NAME_MAX: usize = 255;

/// Largest record a single event can occupy
pub const MAX_RECORD_SIZE: usize = HEADER_SIZE + NAME_MAX + 1;

bitflags! {
    /// Kind bits carried in a record's mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was accessed
        const ACCESS = 0x0000_0001;
        /// File was modified
        const MODIFY = 0x0000_0002;
        /// Metadata changed
        const ATTRIB = 0x0000_0004;
        /// File opened for writing was closed
        const CLOSE_WRITE = 0x0000_0008;
        /// File not opened for writing was closed
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File or directory was opened
        const OPEN = 0x0000_0020;
        /// Entry moved out of the watched directory
        const MOVED_FROM = 0x0000_0040;
        /// Entry moved into the watched directory
        const MOVED_TO = 0x0000_0080;
        /// Entry created in the watched directory
        const CREATE = 0x0000_0100;
        /// Entry deleted from the watched directory
        const DELETE = 0x0000_0200;
        /// Watched object itself was deleted
        const DELETE_SELF = 0x0000_0400;
        /// Watched object itself was moved
        const MOVE_SELF = 0x0000_0800;
        /// Filesystem containing the watched object was unmounted
        const UNMOUNT = 0x0000_2000;
        /// Kernel event queue overflowed
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed
        const IGNORED = 0x0000_8000;
        /// Subject of the event is a directory
        const ISDIR = 0x4000_0000;
    }
}

impl EventMask {
    /// Every event kind a watch can subscribe to (`IN_ALL_EVENTS`)
    pub const WATCH_ALL: Self = Self::from_bits_retain(0x0000_0fff);
}

/// One decoded notification, borrowing its name from the read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord<'a> {
    /// Watch descriptor of the registration that produced the event
    pub wd: i32,
    /// Event kinds
    pub mask: EventMask,
    /// Correlates `MOVED_FROM`/`MOVED_TO` pairs, 0 when unused
    pub cookie: u32,
    /// Entry name inside a watched directory, padding stripped
    pub name: Option<&'a OsStr>,
}

impl<'a> EventRecord<'a> {
    /// Append this record to `out` the way the kernel lays it out
    ///
    /// The name is NUL terminated and padded to a multiple of
    /// [`HEADER_SIZE`]; a record without a name declares length 0.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        self.encode_padded(out, Some(HEADER_SIZE));
    }

    /// Append this record with the name NUL terminated and padded to a
    /// multiple of `align`, or with `None`, stored bare with its declared
    /// length equal to the name length
    pub fn encode_padded(&self, out: &mut Vec<u8>, align: Option<usize>) {
        let name = self.name.map(OsStr::as_bytes).unwrap_or_default();
        let declared_len = match (self.name, align) {
            (None, _) => 0,
            (Some(_), None) => name.len(),
            (Some(_), Some(align)) => (name.len() + 1).div_ceil(align.max(1)) * align.max(1),
        };

        out.extend_from_slice(&self.wd.to_ne_bytes());
        out.extend_from_slice(&self.mask.bits().to_ne_bytes());
        out.extend_from_slice(&self.cookie.to_ne_bytes());
        out.extend_from_slice(&(declared_len as u32).to_ne_bytes());
        out.extend_from_slice(name);
        out.resize(out.len() + declared_len - name.len(), 0);
    }
}

/// Failure to partition a read buffer into well-formed records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("read returned {valid} bytes but the buffer holds only {capacity}")]
    LengthExceedsBuffer { valid: usize, capacity: usize },

    #[error("truncated record header at offset {offset}: {remaining} bytes left, need {}", HEADER_SIZE)]
    TruncatedHeader { offset: usize, remaining: usize },

    #[error("record at offset {offset} declares a {name_len}-byte name but only {remaining} bytes follow its header")]
    NameOverrun {
        offset: usize,
        name_len: usize,
        remaining: usize,
    },
}

/// Lazily decode the first `valid` bytes of `buffer`
///
/// Every call starts again from offset 0. The iterator yields at most one
/// error and then ends.
pub fn events(buffer: &[u8], valid: usize) -> Events<'_> {
    Events {
        buffer,
        valid,
        pos: 0,
        done: false,
    }
}

/// Decode the first `valid` bytes of `buffer` into a vector
pub fn decode(buffer: &[u8], valid: usize) -> Result<Vec<EventRecord<'_>>, DecodeError> {
    events(buffer, valid).collect()
}

/// Iterator over the records of one read buffer
pub struct Events<'a> {
    buffer: &'a [u8],
    valid: usize,
    pos: usize,
    done: bool,
}

impl<'a> Events<'a> {
    fn decode_next(&mut self) -> Result<EventRecord<'a>, DecodeError> {
        if self.valid > self.buffer.len() {
            return Err(DecodeError::LengthExceedsBuffer {
                valid: self.valid,
                capacity: self.buffer.len(),
            });
        }

        let offset = self.pos;
        let remaining = self.valid - offset;
        if remaining < HEADER_SIZE {
            return Err(DecodeError::TruncatedHeader { offset, remaining });
        }

        let header = &self.buffer[offset..offset + HEADER_SIZE];
        let wd = i32::from_ne_bytes(word(header, 0));
        let mask = u32::from_ne_bytes(word(header, 4));
        let cookie = u32::from_ne_bytes(word(header, 8));
        let name_len = u32::from_ne_bytes(word(header, 12)) as usize;

        let body = remaining - HEADER_SIZE;
        if name_len > body {
            return Err(DecodeError::NameOverrun {
                offset,
                name_len,
                remaining: body,
            });
        }

        let start = offset + HEADER_SIZE;
        let name = if name_len == 0 {
            None
        } else {
            Some(OsStr::from_bytes(trim_padding(&self.buffer[start..start + name_len])))
        };

        self.pos = start + name_len;

        Ok(EventRecord {
            wd,
            mask: EventMask::from_bits_retain(mask),
            cookie,
            name,
        })
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = Result<EventRecord<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.valid {
            return None;
        }

        let result = self.decode_next();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

fn word(header: &[u8], at: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&header[at..at + 4]);
    bytes
}

/// Names are NUL padded up to the record alignment
fn trim_padding(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    }
}
