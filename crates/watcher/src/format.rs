//! Rendering of decoded events for standard output

use crate::event::{EventMask, EventRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::str::FromStr;

/// Kind names in the order they are printed
pub const KIND_NAMES: [(EventMask, &str); 16] = [
    (EventMask::ACCESS, "IN_ACCESS"),
    (EventMask::ATTRIB, "IN_ATTRIB"),
    (EventMask::CLOSE_WRITE, "IN_CLOSE_WRITE"),
    (EventMask::CLOSE_NOWRITE, "IN_CLOSE_NOWRITE"),
    (EventMask::CREATE, "IN_CREATE"),
    (EventMask::DELETE, "IN_DELETE"),
    (EventMask::DELETE_SELF, "IN_DELETE_SELF"),
    (EventMask::IGNORED, "IN_IGNORED"),
    (EventMask::ISDIR, "IN_ISDIR"),
    (EventMask::MODIFY, "IN_MODIFY"),
    (EventMask::MOVE_SELF, "IN_MOVE_SELF"),
    (EventMask::MOVED_FROM, "IN_MOVED_FROM"),
    (EventMask::MOVED_TO, "IN_MOVED_TO"),
    (EventMask::OPEN, "IN_OPEN"),
    (EventMask::Q_OVERFLOW, "IN_Q_OVERFLOW"),
    (EventMask::UNMOUNT, "IN_UNMOUNT"),
];

/// Names of the kinds set in `mask`; unknown bits are skipped
pub fn kind_names(mask: EventMask) -> impl Iterator<Item = &'static str> {
    KIND_NAMES
        .into_iter()
        .filter(move |(kind, _)| mask.contains(*kind))
        .map(|(_, name)| name)
}

/// Single-line text rendering
///
/// `Inotify event: wd = 0x1; cookie = 0x2a; mask = IN_MOVED_FROM; name = a.txt`
///
/// The name is copied byte for byte, so a name that is not valid UTF-8 is
/// printed exactly as the kernel reported it.
pub fn format_text(record: &EventRecord<'_>) -> Vec<u8> {
    let mut line = format!("Inotify event: wd = 0x{:x}", record.wd);

    if record.cookie != 0 {
        line.push_str(&format!("; cookie = 0x{:x}", record.cookie));
    }

    let kinds: Vec<&str> = kind_names(record.mask).collect();
    line.push_str("; mask = ");
    line.push_str(&kinds.join(" "));

    let mut line = line.into_bytes();
    if let Some(name) = record.name {
        line.extend_from_slice(b"; name = ");
        line.extend_from_slice(name.as_bytes());
    }

    line
}

/// One compact JSON object per event
///
/// JSON strings must be UTF-8, so invalid bytes in the name are replaced
/// with U+FFFD here.
pub fn format_json(record: &EventRecord<'_>) -> String {
    serde_json::json!({
        "wd": record.wd,
        "cookie": record.cookie,
        "mask": record.mask.bits(),
        "kinds": kind_names(record.mask).collect::<Vec<_>>(),
        "name": record.name.map(|n| n.to_string_lossy()),
    })
    .to_string()
}

/// How events are written to standard output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    /// One output line, without the trailing newline
    pub fn render(self, record: &EventRecord<'_>) -> Vec<u8> {
        match self {
            OutputFormat::Text => format_text(record),
            OutputFormat::Json => format_json(record).into_bytes(),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected text or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}
