//! Event records: data model and wire codec.
//!
//! This module groups the record **data model** produced by callers of the
//! [`Producer`](crate::Producer) API and the fixed-size **wire format** the
//! consumer reads through its [`Session`](crate::Session).
//!
//! ## Contents
//! - [`EventRecord`], [`Severity`], [`EventKind`], [`Payload`] the data model
//! - [`wire`] fixed-size encode/decode at the read boundary

mod record;
pub mod wire;

pub use record::{
    EventKind, EventRecord, MAX_TEXT_LEN, MSG_MAX_LEN, Payload, Severity, UNKNOWN_LEVEL,
    level_label,
};
pub use wire::{RECORD_SIZE, WireBody, WireEvent};
