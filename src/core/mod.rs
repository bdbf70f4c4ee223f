//! # Core Wire Components
//!
//! Byte-level encodings shared by every channel.
//!
//! ## Wire Format
//! Typed values travel as fixed-width big-endian binary (numbers), a single
//! byte (booleans), or UTF-8 (strings). Message boundaries are the channel's
//! concern, not the encoding's: a stop byte terminates each message when
//! stop-byte framing is enabled, and the serialized-object path carries its
//! own 4-byte big-endian length prefix.

pub mod encoding;
