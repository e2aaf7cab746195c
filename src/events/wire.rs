//! # Fixed-size wire format of one record.
//!
//! ```text
//! offset  size  field
//! 0       4     kind      (i32, host byte order)
//! 4       4     severity  (i32, host byte order)
//! 8       1024  payload   (RawString: NUL-terminated text, zero padded)
//! ```
//!
//! The payload area is sized to the largest variant. Readers must consume exactly
//! [`RECORD_SIZE`] bytes; a partial record is never decoded.

use crate::error::WireError;
use crate::events::record::{EventKind, EventRecord, MSG_MAX_LEN, Payload, level_label};

const KIND_OFFSET: usize = 0;
const LEVEL_OFFSET: usize = 4;
const PAYLOAD_OFFSET: usize = 8;

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = PAYLOAD_OFFSET + MSG_MAX_LEN;

/// Encodes `record` into its wire representation.
pub fn encode(record: &EventRecord) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[KIND_OFFSET..LEVEL_OFFSET].copy_from_slice(&record.kind().code().to_ne_bytes());
    buf[LEVEL_OFFSET..PAYLOAD_OFFSET].copy_from_slice(&record.severity().level().to_ne_bytes());

    if let Payload::RawString(text) = record.payload() {
        // Construction bounds the text to MSG_MAX_LEN - 1, leaving room for the NUL.
        let n = text.len().min(MSG_MAX_LEN - 1);
        buf[PAYLOAD_OFFSET..PAYLOAD_OFFSET + n].copy_from_slice(&text.as_bytes()[..n]);
    }
    buf
}

/// Body of a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    RawString(String),
    /// Known or unknown kind the consumer does not render; carries the raw code.
    Unsupported(i32),
}

/// A record as seen by the consumer.
///
/// The level is kept raw: the wire may carry values outside the severity table,
/// and the consumer renders those as `UNKNOWN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    pub level: i32,
    pub body: WireBody,
}

impl WireEvent {
    /// Severity label for [`WireEvent::level`].
    pub fn level_label(&self) -> &'static str {
        level_label(self.level)
    }
}

/// Decodes exactly one record from `buf`.
///
/// Text is read up to the first NUL (or the end of the payload area); invalid
/// UTF-8 is replaced rather than rejected.
pub fn decode(buf: &[u8]) -> Result<WireEvent, WireError> {
    if buf.len() < RECORD_SIZE {
        return Err(WireError::Short {
            expected: RECORD_SIZE,
            got: buf.len(),
        });
    }
    if buf.len() > RECORD_SIZE {
        return Err(WireError::Oversized { got: buf.len() });
    }

    let kind = read_i32(buf, KIND_OFFSET);
    let level = read_i32(buf, LEVEL_OFFSET);

    let body = match EventKind::from_code(kind) {
        Some(EventKind::RawString) => {
            let area = &buf[PAYLOAD_OFFSET..RECORD_SIZE];
            let end = area.iter().position(|b| *b == 0).unwrap_or(area.len());
            WireBody::RawString(String::from_utf8_lossy(&area[..end]).into_owned())
        }
        _ => WireBody::Unsupported(kind),
    };
    Ok(WireEvent { level, body })
}

/// Builds an [`EventRecord`] from a wire frame submitted by an external producer.
///
/// Unlike [`decode`], this is strict: unknown kinds and out-of-range levels are errors.
pub fn record_from_frame(buf: &[u8]) -> Result<EventRecord, WireError> {
    let ev = decode(buf)?;
    let severity = crate::events::Severity::from_level(ev.level)
        .ok_or(WireError::InvalidLevel { level: ev.level })?;

    match ev.body {
        WireBody::RawString(text) => {
            EventRecord::raw_string(severity, &text).map_err(|_| WireError::InvalidPayload)
        }
        WireBody::Unsupported(code) => match EventKind::from_code(code) {
            Some(EventKind::Struct) => Ok(EventRecord::structured(severity)),
            _ => Err(WireError::UnknownKind { kind: code }),
        },
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_ne_bytes(raw)
}
