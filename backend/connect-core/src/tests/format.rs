use crate::methods::format::{hex_to_bytes, message_to_hex};

#[test]
fn given_hex_message_when_normalised_then_prefix_stripped_and_padded() {
    assert_eq!(message_to_hex("0xABC"), "0abc");
    assert_eq!(message_to_hex("deadBEEF"), "deadbeef");
}

#[test]
fn given_text_message_when_normalised_then_utf8_hex() {
    assert_eq!(message_to_hex("hello"), "68656c6c6f");
    assert_eq!(message_to_hex("0x"), "3078");
}

#[test]
fn given_hex_payload_when_decoded_then_bytes() {
    assert_eq!(hex_to_bytes("0x0102ff").unwrap(), vec![1, 2, 255]);
    assert!(hex_to_bytes("0x0g").is_err());
}
