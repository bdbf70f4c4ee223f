//! # Error Types
//!
//! Error handling for the channel transport.
//!
//! This module defines every error variant the crate can produce, from
//! low-level I/O failures to lifecycle violations on listeners, endpoints
//! and channels.
//!
//! ## Error Categories
//! - **I/O Errors**: socket failures, resets, timeouts
//! - **Lifecycle Errors**: operation invalid for the resource's current state
//!   (`AlreadyOpen`, `AlreadyBound`, `NotBound`, `ConnectionClosed`)
//! - **Permission Errors**: read attempted on a write-only channel or vice versa
//! - **Decode Errors**: malformed typed payloads, serialization failures
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use netchannel::error::{Error, Result};
//!
//! fn parse_port(raw: &str) -> Result<u16> {
//!     raw.parse()
//!         .map_err(|e| Error::Config(format!("invalid port {raw}: {e}")))
//! }
//!
//! assert!(parse_port("nine").is_err());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Channel capability violations
    pub const ERR_READ_DENIED: &str = "Read attempted on a write-only channel";
    pub const ERR_WRITE_DENIED: &str = "Write attempted on a read-only channel";
}

/// Primary error type for all channel operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Endpoint already open")]
    AlreadyOpen,

    #[error("Listener already bound")]
    AlreadyBound,

    #[error("Listener not bound")]
    NotBound,

    #[error("{0}")]
    NoPermission(&'static str),

    #[error("Unsupported transport mode: {0}")]
    UnsupportedMode(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Results using the crate error type
pub type Result<T> = std::result::Result<T, Error>;
