//! EIP-712 typed data as the device walks it.
//!
//! The device asks for struct definitions by name and for values by member
//! path. [`build_struct_ack`] answers the first, [`encode_member`] the
//! second. The caller's JSON is walked through a small tagged view
//! ([`Node`]) instead of probing arbitrary JSON ad hoc.

use crate::device::DeviceMessage;
use crate::error::ConnectError;
use crate::methods::format::message_to_hex;

use std::collections::HashMap;
use std::sync::OnceLock;

use alloy_primitives::U256;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

pub const EIP712_DOMAIN: &str = "EIP712Domain";

pub const STRUCT_REQUEST: &str = "EthereumTypedDataStructRequest";
pub const VALUE_REQUEST: &str = "EthereumTypedDataValueRequest";
pub const SIGNATURE: &str = "EthereumTypedDataSignature";

const ARRAY_TYPE_PATTERN: &str = r"^(.*)\[([0-9]*)\]$";
const NUMBER_TYPE_PATTERN: &str = r"^(u?int)([0-9]*)$";
const BYTES_TYPE_PATTERN: &str = r"^bytes([0-9]*)$";

static ARRAY_TYPE_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_TYPE_REGEX: OnceLock<Regex> = OnceLock::new();
static BYTES_TYPE_REGEX: OnceLock<Regex> = OnceLock::new();

fn array_type_regex() -> &'static Regex {
    ARRAY_TYPE_REGEX.get_or_init(|| Regex::new(ARRAY_TYPE_PATTERN).expect("valid regex pattern"))
}

fn number_type_regex() -> &'static Regex {
    NUMBER_TYPE_REGEX.get_or_init(|| Regex::new(NUMBER_TYPE_PATTERN).expect("valid regex pattern"))
}

fn bytes_type_regex() -> &'static Regex {
    BYTES_TYPE_REGEX.get_or_init(|| Regex::new(BYTES_TYPE_PATTERN).expect("valid regex pattern"))
}

// ============================================
// CALLER DATA
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedData {
    pub types: HashMap<String, Vec<TypedMember>>,
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    #[serde(default = "empty_object")]
    pub domain: Value,
    #[serde(default = "empty_object")]
    pub message: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl TypedData {
    pub fn is_domain_only(&self) -> bool {
        self.primary_type == EIP712_DOMAIN
    }
}

// ============================================
// DEVICE REPLIES
// ============================================

/// Replies the device may send during the typed-data exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedDataResponse {
    StructRequest { name: String },
    ValueRequest { member_path: Vec<u32> },
    Signature { address: String, signature: String },
}

impl TypedDataResponse {
    pub fn parse(reply: &DeviceMessage) -> Result<Self, ConnectError> {
        let body = &reply.message;
        match reply.message_type.as_str() {
            STRUCT_REQUEST => Ok(TypedDataResponse::StructRequest {
                name: str_field(body, "name")?.to_string(),
            }),
            VALUE_REQUEST => {
                let member_path = body
                    .get("member_path")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ConnectError::runtime("ValueRequest without member_path"))?
                    .iter()
                    .map(|index| {
                        index
                            .as_u64()
                            .and_then(|n| u32::try_from(n).ok())
                            .ok_or_else(|| ConnectError::runtime("Invalid member_path index"))
                    })
                    .collect::<Result<Vec<u32>, _>>()?;
                Ok(TypedDataResponse::ValueRequest { member_path })
            }
            SIGNATURE => Ok(TypedDataResponse::Signature {
                address: str_field(body, "address")?.to_string(),
                signature: str_field(body, "signature")?.to_string(),
            }),
            other => Err(ConnectError::runtime(format!(
                "Unexpected typed data reply {other}"
            ))),
        }
    }
}

fn str_field<'a>(body: &'a Value, field: &str) -> Result<&'a str, ConnectError> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectError::runtime(format!("Device reply is missing {field}")))
}

// ============================================
// FIELD TYPES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthereumDataType {
    Uint = 1,
    Int = 2,
    Bytes = 3,
    String = 4,
    Bool = 5,
    Address = 6,
    Array = 7,
    Struct = 8,
}

impl Serialize for EthereumDataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

/// Wire description of one member's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthereumFieldType {
    pub data_type: EthereumDataType,
    pub size: Option<u32>,
    pub entry_type: Option<Box<EthereumFieldType>>,
    pub struct_name: Option<String>,
}

impl EthereumFieldType {
    fn simple(data_type: EthereumDataType, size: Option<u32>) -> Self {
        Self {
            data_type,
            size,
            entry_type: None,
            struct_name: None,
        }
    }
}

impl Serialize for EthereumFieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("EthereumFieldType", 4)?;
        state.serialize_field("data_type", &self.data_type)?;
        if let Some(size) = self.size {
            state.serialize_field("size", &size)?;
        }
        if let Some(entry_type) = &self.entry_type {
            state.serialize_field("entry_type", entry_type)?;
        }
        if let Some(struct_name) = &self.struct_name {
            state.serialize_field("struct_name", struct_name)?;
        }
        state.end()
    }
}

/// Split `T[]` / `T[n]` into the entry type name and the optional size.
pub fn parse_array_type(type_name: &str) -> Result<(&str, Option<u32>), ConnectError> {
    let captures = array_type_regex()
        .captures(type_name)
        .ok_or_else(|| ConnectError::runtime(format!("Could not parse array type {type_name}")))?;
    let entry = captures.get(1).map_or("", |m| m.as_str());
    let size = captures.get(2).and_then(|m| m.as_str().parse().ok());
    Ok((entry, size))
}

/// Byte width of `uintN`/`intN`. Bare `uint`/`int` is 256 bits.
fn int_width(bits: &str) -> Result<u32, ConnectError> {
    let bits: u32 = if bits.is_empty() {
        256
    } else {
        bits.parse()
            .map_err(|_| ConnectError::runtime(format!("Invalid integer width {bits}")))?
    };
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(ConnectError::runtime(format!("Invalid integer width {bits}")));
    }
    Ok(bits / 8)
}

pub fn get_field_type(
    type_name: &str,
    types: &HashMap<String, Vec<TypedMember>>,
) -> Result<EthereumFieldType, ConnectError> {
    if array_type_regex().is_match(type_name) {
        let (entry, size) = parse_array_type(type_name)?;
        return Ok(EthereumFieldType {
            data_type: EthereumDataType::Array,
            size,
            entry_type: Some(Box::new(get_field_type(entry, types)?)),
            struct_name: None,
        });
    }

    if let Some(captures) = number_type_regex().captures(type_name) {
        let data_type = if &captures[1] == "uint" {
            EthereumDataType::Uint
        } else {
            EthereumDataType::Int
        };
        return Ok(EthereumFieldType::simple(data_type, Some(int_width(&captures[2])?)));
    }

    if let Some(captures) = bytes_type_regex().captures(type_name) {
        let size = captures[1].parse().ok();
        return Ok(EthereumFieldType::simple(EthereumDataType::Bytes, size));
    }

    match type_name {
        "bool" => return Ok(EthereumFieldType::simple(EthereumDataType::Bool, None)),
        "address" => return Ok(EthereumFieldType::simple(EthereumDataType::Address, None)),
        "string" => return Ok(EthereumFieldType::simple(EthereumDataType::String, None)),
        _ => {}
    }

    if let Some(members) = types.get(type_name) {
        return Ok(EthereumFieldType {
            data_type: EthereumDataType::Struct,
            size: Some(members.len() as u32),
            entry_type: None,
            struct_name: Some(type_name.to_string()),
        });
    }

    Err(ConnectError::runtime(format!(
        "No type definition specified: {type_name}"
    )))
}

/// Body of `EthereumTypedDataStructAck` for the struct `name`.
pub fn build_struct_ack(
    types: &HashMap<String, Vec<TypedMember>>,
    name: &str,
) -> Result<Value, ConnectError> {
    let definition = types.get(name).ok_or_else(|| {
        ConnectError::runtime(format!("Type {name} was not defined in types object"))
    })?;

    let members = definition
        .iter()
        .map(|member| {
            Ok(json!({
                "name": member.name,
                "type": get_field_type(&member.type_name, types)?,
            }))
        })
        .collect::<Result<Vec<Value>, ConnectError>>()?;

    Ok(json!({ "members": members }))
}

// ============================================
// MEMBER PATH WALK
// ============================================

/// Tagged view over a JSON value.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
    Leaf(&'a Value),
}

impl<'a> Node<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Node::Array(items),
            Value::Object(fields) => Node::Object(fields),
            other => Node::Leaf(other),
        }
    }
}

/// Where a member path lands: the declared type name and the value there.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMember<'a> {
    pub type_name: &'a str,
    pub node: Node<'a>,
}

pub fn resolve_member_path<'a>(
    data: &'a TypedData,
    member_path: &[u32],
) -> Result<ResolvedMember<'a>, ConnectError> {
    let (root, nested) = member_path
        .split_first()
        .ok_or_else(|| ConnectError::runtime("Empty member path"))?;

    let (mut value, mut type_name): (&Value, &str) = match root {
        0 => (&data.domain, EIP712_DOMAIN),
        1 => (&data.message, data.primary_type.as_str()),
        _ => return Err(ConnectError::runtime("Root index can only be 0 or 1")),
    };

    for index in nested {
        let position = *index as usize;
        match Node::of(value) {
            Node::Array(items) => {
                type_name = parse_array_type(type_name)?.0;
                value = items.get(position).ok_or_else(|| {
                    ConnectError::runtime(format!("Array index {index} out of range"))
                })?;
            }
            Node::Object(fields) => {
                let member = data
                    .types
                    .get(type_name)
                    .and_then(|members| members.get(position))
                    .ok_or_else(|| {
                        ConnectError::runtime(format!("Type {type_name} has no member {index}"))
                    })?;
                type_name = member.type_name.as_str();
                value = fields.get(&member.name).ok_or_else(|| {
                    ConnectError::runtime(format!("Value for {} is missing", member.name))
                })?;
            }
            Node::Leaf(_) => {
                return Err(ConnectError::runtime(format!(
                    "Member path descends into primitive {type_name}"
                )));
            }
        }
    }

    Ok(ResolvedMember {
        type_name,
        node: Node::of(value),
    })
}

/// Hex body of `EthereumTypedDataValueAck` for the member at `member_path`.
///
/// Arrays answer with their length as `uint16`; the device then asks for
/// each element separately.
pub fn encode_member(data: &TypedData, member_path: &[u32]) -> Result<String, ConnectError> {
    let resolved = resolve_member_path(data, member_path)?;
    match resolved.node {
        Node::Array(items) => encode_data("uint16", &json!(items.len())),
        Node::Object(_) => Err(ConnectError::runtime(format!(
            "Struct {} cannot be encoded as a value",
            resolved.type_name
        ))),
        Node::Leaf(value) => encode_data(resolved.type_name, value),
    }
}

// ============================================
// VALUE ENCODING
// ============================================

pub fn encode_data(type_name: &str, value: &Value) -> Result<String, ConnectError> {
    if bytes_type_regex().is_match(type_name) || type_name == "address" {
        let text = value.as_str().ok_or_else(|| {
            ConnectError::runtime(format!("Value for {type_name} must be a string"))
        })?;
        return Ok(message_to_hex(text));
    }

    if type_name == "string" {
        let text = value
            .as_str()
            .ok_or_else(|| ConnectError::runtime("Value for string must be a string"))?;
        return Ok(hex::encode(text.as_bytes()));
    }

    if let Some(captures) = number_type_regex().captures(type_name) {
        let size = int_width(&captures[2])? as usize;
        return int_to_hex(value, size, &captures[1] == "int");
    }

    if type_name == "bool" {
        let flag = value
            .as_bool()
            .ok_or_else(|| ConnectError::runtime("Value for bool must be a boolean"))?;
        return Ok(if flag { "01" } else { "00" }.to_string());
    }

    Err(ConnectError::runtime(format!(
        "Unsupported data type for direct field encoding: {type_name}"
    )))
}

/// Big-endian, `size` bytes, two's complement when `signed`.
fn int_to_hex(value: &Value, size: usize, signed: bool) -> Result<String, ConnectError> {
    let text = match value {
        Value::Number(n) if !n.is_f64() => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => {
            return Err(ConnectError::runtime(format!(
                "Value {value} is not an integer"
            )));
        }
    };

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
        None => U256::from_str_radix(digits, 10),
    }
    .map_err(|e| ConnectError::runtime(format!("Value {text} is not an integer: {e}")))?;

    let bits = size * 8;
    let out_of_range = || ConnectError::runtime(format!("Value {text} does not fit in {bits} bits"));

    let encoded = if signed {
        let limit = U256::from(1u8) << (bits - 1);
        if negative {
            if magnitude > limit {
                return Err(out_of_range());
            }
            U256::ZERO.wrapping_sub(magnitude)
        } else {
            if magnitude >= limit {
                return Err(out_of_range());
            }
            magnitude
        }
    } else {
        if negative && !magnitude.is_zero() {
            return Err(out_of_range());
        }
        if magnitude.bit_len() > bits {
            return Err(out_of_range());
        }
        magnitude
    };

    let bytes: [u8; 32] = encoded.to_be_bytes();
    Ok(hex::encode(&bytes[32 - size..]))
}
