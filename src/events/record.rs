//! # Event records handed from producers to the consumer.
//!
//! An [`EventRecord`] describes one occurrence. It is built once by a producer,
//! moved into the queue (which takes ownership), and never mutated afterward.
//!
//! The payload is an explicit sum type keyed by [`EventKind`]; the fixed-size
//! memory layout only exists at the wire boundary (see [`wire`](super::wire)).
//!
//! ## Example
//! ```rust
//! use eventd::{EventKind, EventRecord, Severity};
//!
//! let ev = EventRecord::raw_string(Severity::Warning, "disk full").unwrap();
//! assert_eq!(ev.kind(), EventKind::RawString);
//! assert_eq!(ev.severity(), Severity::Warning);
//! assert_eq!(ev.text(), Some("disk full"));
//! ```

use std::fmt;

use crate::error::QueueError;

/// Maximum size of the text payload on the wire, including the NUL terminator.
pub const MSG_MAX_LEN: usize = 1024;

/// Longest text a raw-string record can carry (one byte is reserved for the terminator).
pub const MAX_TEXT_LEN: usize = MSG_MAX_LEN - 1;

/// Labels indexed by the numeric severity level.
const LEVEL_LABELS: [&str; 3] = ["INFO", "WARNING", "ERROR"];

/// Label used for levels outside [`LEVEL_LABELS`].
pub const UNKNOWN_LEVEL: &str = "UNKNOWN";

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Numeric level used on the wire.
    pub fn level(self) -> i32 {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    /// Parses a wire level; `None` for out-of-range values.
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Severity::Info),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Error),
            _ => None,
        }
    }

    /// Upper-case label (`INFO`, `WARNING`, `ERROR`).
    pub fn as_label(self) -> &'static str {
        level_label(self.level())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Renders a raw numeric level through the fixed label table.
///
/// Any value outside the table maps to [`UNKNOWN_LEVEL`].
pub fn level_label(level: i32) -> &'static str {
    usize::try_from(level)
        .ok()
        .and_then(|idx| LEVEL_LABELS.get(idx).copied())
        .unwrap_or(UNKNOWN_LEVEL)
}

/// Kind discriminant of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Free-form text, up to [`MAX_TEXT_LEN`] bytes.
    RawString,
    /// Reserved structured kind; carries no payload and is not rendered by the consumer.
    Struct,
}

impl EventKind {
    /// Numeric code used on the wire.
    pub fn code(self) -> i32 {
        match self {
            EventKind::RawString => 0,
            EventKind::Struct => 1,
        }
    }

    /// Parses a wire code; `None` for codes this build does not know.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(EventKind::RawString),
            1 => Some(EventKind::Struct),
            _ => None,
        }
    }
}

/// Payload variants, one per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    RawString(String),
    Struct,
}

/// One occurrence reported by a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    severity: Severity,
    payload: Payload,
}

impl EventRecord {
    /// Builds a raw-string record.
    ///
    /// ### Length policy
    /// - Text longer than [`MAX_TEXT_LEN`] bytes is **truncated** at the last UTF-8
    ///   boundary that fits, and a warning is logged.
    /// - Text containing a NUL byte is **rejected** with [`QueueError::InvalidArgument`],
    ///   since the wire payload is NUL-terminated and would silently cut it.
    /// - Allocation failure is reported as [`QueueError::OutOfMemory`].
    pub fn raw_string(severity: Severity, text: &str) -> Result<Self, QueueError> {
        if text.as_bytes().contains(&0) {
            return Err(QueueError::InvalidArgument {
                reason: "text contains a NUL byte".to_string(),
            });
        }

        let bounded = truncate_to_boundary(text, MAX_TEXT_LEN);
        if bounded.len() < text.len() {
            tracing::warn!(
                original = text.len(),
                kept = bounded.len(),
                "raw string exceeds payload capacity; truncated"
            );
        }

        let mut owned = String::new();
        owned
            .try_reserve_exact(bounded.len())
            .map_err(|_| QueueError::OutOfMemory)?;
        owned.push_str(bounded);

        Ok(Self {
            severity,
            payload: Payload::RawString(owned),
        })
    }

    /// Builds a record of the reserved structured kind.
    pub fn structured(severity: Severity) -> Self {
        Self {
            severity,
            payload: Payload::Struct,
        }
    }

    /// Record kind, derived from the payload variant.
    pub fn kind(&self) -> EventKind {
        match self.payload {
            Payload::RawString(_) => EventKind::RawString,
            Payload::Struct => EventKind::Struct,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Text of a raw-string record; `None` for other kinds.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::RawString(s) => Some(s),
            Payload::Struct => None,
        }
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
fn truncate_to_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
