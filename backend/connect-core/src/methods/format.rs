/// Normalise a message or hash to bare lowercase hex.
///
/// Hex input (with or without `0x`) is kept, left-padded to an even length.
/// Anything else is taken as UTF-8 text and hex-encoded.
pub fn message_to_hex(message: &str) -> String {
    let stripped = message
        .strip_prefix("0x")
        .or_else(|| message.strip_prefix("0X"))
        .unwrap_or(message);

    if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
        let padded = if stripped.len() % 2 == 1 {
            format!("0{stripped}")
        } else {
            stripped.to_string()
        };
        return padded.to_ascii_lowercase();
    }

    hex::encode(message.as_bytes())
}

/// Bytes of a hex payload, `0x` optional.
pub fn hex_to_bytes(payload: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let stripped = payload
        .strip_prefix("0x")
        .or_else(|| payload.strip_prefix("0X"))
        .unwrap_or(payload);
    hex::decode(stripped)
}
