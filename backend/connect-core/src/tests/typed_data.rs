use crate::device::DeviceMessage;
use crate::methods::ethereum::typed_data::{
    TypedData, TypedDataResponse, build_struct_ack, encode_data, encode_member, get_field_type,
};

use serde_json::{Value, json};

fn mail() -> TypedData {
    serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "chainId", "type": "uint256" }
            ],
            "Person": [
                { "name": "name", "type": "string" },
                { "name": "age", "type": "uint8" }
            ],
            "Mail": [
                { "name": "from", "type": "Person" },
                { "name": "to", "type": "Person[]" },
                { "name": "contents", "type": "string" }
            ]
        },
        "primaryType": "Mail",
        "domain": { "name": "Ether Mail", "chainId": 1 },
        "message": {
            "from": { "name": "Cow", "age": 20 },
            "to": [
                { "name": "Bob", "age": 30 },
                { "name": "Alice", "age": 25 }
            ],
            "contents": "Hello"
        }
    }))
    .unwrap()
}

/// **VALUE**: Member paths walk message, struct members and array elements in
/// declaration order.
///
/// **WHY THIS MATTERS**: The device hashes whatever value it receives. Answering a
/// value request with the wrong member produces a valid-looking signature over the
/// wrong data.
///
/// **BUG THIS CATCHES**: Would catch member lookup by object key order instead of the
/// type's declared member order.
#[test]
fn given_nested_member_path_when_encoded_then_declared_member_value() {
    let data = mail();

    // message.from.age (uint8 = 20)
    assert_eq!(encode_member(&data, &[1, 0, 1]).unwrap(), "14");
    // message.to[0].name
    assert_eq!(encode_member(&data, &[1, 1, 0, 0]).unwrap(), hex::encode("Bob"));
    // message.contents
    assert_eq!(encode_member(&data, &[1, 2]).unwrap(), hex::encode("Hello"));
}

#[test]
fn given_array_member_when_encoded_then_length_as_uint16() {
    assert_eq!(encode_member(&mail(), &[1, 1]).unwrap(), "0002");
}

#[test]
fn given_domain_root_when_encoded_then_domain_values_used() {
    let encoded = encode_member(&mail(), &[0, 1]).unwrap();

    assert_eq!(encoded.len(), 64);
    assert!(encoded.ends_with("01"));
    assert!(encoded.trim_end_matches("01").chars().all(|c| c == '0'));
}

#[test]
fn given_bad_root_index_when_encoded_then_runtime_error() {
    let err = encode_member(&mail(), &[2]).unwrap_err();

    assert_eq!(err.code(), "Runtime");
    assert_eq!(err.message(), "Root index can only be 0 or 1");
}

#[test]
fn given_path_into_primitive_when_encoded_then_runtime_error() {
    let err = encode_member(&mail(), &[1, 2, 0]).unwrap_err();

    assert_eq!(err.code(), "Runtime");
}

#[test]
fn given_path_to_struct_when_encoded_then_runtime_error() {
    assert!(encode_member(&mail(), &[1, 0]).is_err());
}

#[test]
fn given_missing_value_when_encoded_then_runtime_error() {
    let mut data = mail();
    data.message = json!({ "from": { "name": "Cow" } });

    let err = encode_member(&data, &[1, 0, 1]).unwrap_err();

    assert_eq!(err.code(), "Runtime");
}

#[test]
fn given_struct_name_when_ack_built_then_members_with_field_types() {
    let data = mail();

    let ack = build_struct_ack(&data.types, "Mail").unwrap();

    assert_eq!(
        ack,
        json!({
            "members": [
                { "name": "from", "type": { "data_type": 8, "size": 2, "struct_name": "Person" } },
                { "name": "to", "type": {
                    "data_type": 7,
                    "entry_type": { "data_type": 8, "size": 2, "struct_name": "Person" }
                } },
                { "name": "contents", "type": { "data_type": 4 } }
            ]
        })
    );
}

#[test]
fn given_undefined_struct_when_ack_built_then_runtime_error() {
    let err = build_struct_ack(&mail().types, "Order").unwrap_err();

    assert_eq!(err.message(), "Type Order was not defined in types object");
}

#[test]
fn given_primitive_type_names_when_field_type_then_sizes_in_bytes() {
    let types = mail().types;
    let as_json = |name: &str| serde_json::to_value(get_field_type(name, &types).unwrap()).unwrap();

    assert_eq!(as_json("uint8"), json!({ "data_type": 1, "size": 1 }));
    assert_eq!(as_json("int"), json!({ "data_type": 2, "size": 32 }));
    assert_eq!(as_json("bytes32"), json!({ "data_type": 3, "size": 32 }));
    assert_eq!(as_json("bytes"), json!({ "data_type": 3 }));
    assert_eq!(as_json("bool"), json!({ "data_type": 5 }));
    assert_eq!(as_json("address"), json!({ "data_type": 6 }));
    assert_eq!(
        as_json("uint16[4]"),
        json!({ "data_type": 7, "size": 4, "entry_type": { "data_type": 1, "size": 2 } })
    );
    assert!(get_field_type("Order", &types).is_err());
}

#[test]
fn given_signed_values_when_encoded_then_twos_complement_at_width() {
    assert_eq!(encode_data("int8", &json!(-1)).unwrap(), "ff");
    assert_eq!(encode_data("int16", &json!(-2)).unwrap(), "fffe");
    assert_eq!(encode_data("int8", &json!(-128)).unwrap(), "80");
    assert_eq!(encode_data("int8", &json!(127)).unwrap(), "7f");
    assert!(encode_data("int8", &json!(128)).is_err());
    assert!(encode_data("int8", &json!(-129)).is_err());
}

#[test]
fn given_unsigned_values_when_encoded_then_big_endian_at_width() {
    assert_eq!(encode_data("uint16", &json!(258)).unwrap(), "0102");
    assert_eq!(encode_data("uint8", &json!("0x1f")).unwrap(), "1f");
    assert_eq!(
        encode_data("uint256", &json!("115792089237316195423570985008687907853269984665640564039457584007913129639935"))
            .unwrap(),
        "f".repeat(64)
    );
    assert!(encode_data("uint8", &json!(256)).is_err());
    assert!(encode_data("uint8", &json!(-1)).is_err());
}

#[test]
fn given_other_primitives_when_encoded_then_hex() {
    assert_eq!(encode_data("bool", &json!(true)).unwrap(), "01");
    assert_eq!(encode_data("bool", &json!(false)).unwrap(), "00");
    assert_eq!(
        encode_data("address", &json!("0xCD2A3D9F938E13CD947EC05ABC7FE734DF8DD826")).unwrap(),
        "cd2a3d9f938e13cd947ec05abc7fe734df8dd826"
    );
    assert_eq!(encode_data("bytes", &json!("0x0102")).unwrap(), "0102");
    assert!(encode_data("Person", &json!({})).is_err());
}

#[test]
fn given_device_replies_when_parsed_then_typed_responses() {
    let value_request = DeviceMessage::new(
        "EthereumTypedDataValueRequest",
        json!({ "member_path": [1, 0, 1] }),
    );
    let signature = DeviceMessage::new(
        "EthereumTypedDataSignature",
        json!({ "address": "0xabc", "signature": "beef" }),
    );
    let unexpected = DeviceMessage::new("Success", Value::Null);

    assert_eq!(
        TypedDataResponse::parse(&value_request).unwrap(),
        TypedDataResponse::ValueRequest { member_path: vec![1, 0, 1] }
    );
    assert_eq!(
        TypedDataResponse::parse(&signature).unwrap(),
        TypedDataResponse::Signature {
            address: "0xabc".to_string(),
            signature: "beef".to_string()
        }
    );
    assert!(TypedDataResponse::parse(&unexpected).is_err());
}
