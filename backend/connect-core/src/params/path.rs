//! BIP-32 derivation paths given either as `m/44'/60'/0'` strings or as
//! arrays of unsigned integers.

use crate::error::ConnectError;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

pub const HARDENED: u32 = 0x8000_0000;

const SEGMENT_PATTERN: &str = r"^(\d+)(['hH])?$";

static SEGMENT_REGEX: OnceLock<Regex> = OnceLock::new();

fn segment_regex() -> &'static Regex {
    SEGMENT_REGEX.get_or_init(|| Regex::new(SEGMENT_PATTERN).expect("valid regex pattern"))
}

pub fn to_hardened(index: u32) -> u32 {
    index | HARDENED
}

pub fn from_hardened(index: u32) -> u32 {
    index & !HARDENED
}

/// Parse and check a path. Fewer than `min_length` segments is an error.
pub fn validate_path(value: &Value, min_length: usize) -> Result<Vec<u32>, ConnectError> {
    let path = match value {
        Value::String(text) => parse_path_string(text)?,
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ConnectError::invalid_parameter("Not a valid path"))
            })
            .collect::<Result<Vec<u32>, _>>()?,
        _ => return Err(ConnectError::invalid_parameter("Path is not an array")),
    };

    if path.len() < min_length {
        return Err(ConnectError::invalid_parameter(format!(
            "Not a valid path: expected at least {min_length} segments"
        )));
    }
    Ok(path)
}

fn parse_path_string(text: &str) -> Result<Vec<u32>, ConnectError> {
    let mut parts = text.trim().split('/');
    match parts.next() {
        Some(root) if root.eq_ignore_ascii_case("m") => {}
        _ => return Err(ConnectError::invalid_parameter("Not a valid path")),
    }

    parts
        .map(|segment| {
            let captures = segment_regex()
                .captures(segment)
                .ok_or_else(|| ConnectError::invalid_parameter("Not a valid path"))?;
            let index: u32 = captures[1]
                .parse()
                .ok()
                .filter(|n| *n < HARDENED)
                .ok_or_else(|| ConnectError::invalid_parameter("Not a valid path"))?;
            Ok(if captures.get(2).is_some() {
                to_hardened(index)
            } else {
                index
            })
        })
        .collect()
}

/// `[44|H, 60|H, 0|H, 0, 0]` -> `m/44'/60'/0'/0/0`.
pub fn serialized_path(path: &[u32]) -> String {
    let mut out = String::from("m");
    for index in path {
        if index & HARDENED != 0 {
            out.push_str(&format!("/{}'", from_hardened(*index)));
        } else {
            out.push_str(&format!("/{index}"));
        }
    }
    out
}

/// Coin type segment of a BIP-44 path.
pub fn slip44_by_path(path: &[u32]) -> Option<u32> {
    path.get(1).map(|index| from_hardened(*index))
}
