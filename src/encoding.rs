//! Shared encoding helpers for the verifier and voting-contract wire formats.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Width of a fixed `bytes32` field.
pub const BYTES32_LEN: usize = 32;

/// Encode `name` as UTF-8 hex right-padded with zero bytes to 32 bytes.
///
/// The result carries a `0x` prefix followed by exactly 64 hex characters,
/// which is how both the verifier and the voting contract expect
/// `attestationType` and `sourceId`.
///
/// # Errors
///
/// Returns an error if `name` is longer than 32 bytes.
pub fn encode_bytes32(name: &str) -> Result<String> {
    let bytes = name.as_bytes();
    if bytes.len() > BYTES32_LEN {
        return Err(Error::Encoding(format!(
            "'{name}' is {} bytes, at most {BYTES32_LEN} fit in bytes32",
            bytes.len()
        )));
    }

    let mut padded = [0u8; BYTES32_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(format!("0x{}", hex::encode(padded)))
}

/// Decode a `bytes32` hex string back to its UTF-8 name, dropping zero padding.
///
/// # Errors
///
/// Returns an error if the input is not 32 bytes of hex or not UTF-8.
pub fn decode_bytes32(encoded: &str) -> Result<String> {
    let bytes = decode_hex(encoded)?;
    if bytes.len() != BYTES32_LEN {
        return Err(Error::Encoding(format!(
            "expected {BYTES32_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(bytes[..end].to_vec())
        .map_err(|e| Error::Encoding(format!("bytes32 is not UTF-8: {e}")))
}

/// Decode a hex string with or without a `0x` prefix.
///
/// # Errors
///
/// Returns an error if the string contains non-hex characters or has odd length.
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(digits).map_err(|e| Error::Encoding(format!("invalid hex '{value}': {e}")))
}

/// Decode a hex string into a 32-byte hash.
///
/// # Errors
///
/// Returns an error if the value is not exactly 32 bytes of hex.
pub fn decode_hash(value: &str) -> Result<[u8; BYTES32_LEN]> {
    let bytes = decode_hex(value)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        Error::Encoding(format!(
            "hash '{value}' is {} bytes, expected {BYTES32_LEN}",
            bytes.len()
        ))
    })
}

/// Serialize a string map to compact JSON text (`{}` when empty).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn compact_json_map(map: &BTreeMap<String, String>) -> Result<String> {
    compact_json(map)
}

/// Serialize any value to compact JSON text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn compact_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Join a base URL and a path segment, inserting a `/` if the base lacks one.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
