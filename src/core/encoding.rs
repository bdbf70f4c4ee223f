//! Typed wire encodings.
//!
//! One message carries exactly one value. Numbers are fixed-width big-endian,
//! booleans a single byte (zero is false, anything else true), strings UTF-8.
//! Decoders require the exact width; a message of the wrong length is a
//! [`Error::Decode`] failure, not a truncation.

use crate::error::{Error, Result};

/// Wire width of a boolean message
pub const BOOL_WIDTH: usize = 1;

fn exact<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        Error::Decode(format!(
            "expected {N}-byte {what}, got {} bytes",
            bytes.len()
        ))
    })
}

pub fn decode_i32(bytes: &[u8]) -> Result<i32> {
    Ok(i32::from_be_bytes(exact(bytes, "integer")?))
}

pub fn decode_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(exact(bytes, "long")?))
}

pub fn decode_f32(bytes: &[u8]) -> Result<f32> {
    Ok(f32::from_be_bytes(exact(bytes, "float")?))
}

pub fn decode_f64(bytes: &[u8]) -> Result<f64> {
    Ok(f64::from_be_bytes(exact(bytes, "double")?))
}

pub fn decode_bool(bytes: &[u8]) -> Result<bool> {
    let [byte] = exact::<BOOL_WIDTH>(bytes, "boolean")?;
    Ok(byte != 0)
}

pub fn decode_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8 string: {e}")))
}

pub fn encode_bool(value: bool) -> [u8; BOOL_WIDTH] {
    [u8::from(value)]
}
