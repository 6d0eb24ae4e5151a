//! Declarative validation of untyped call parameters.
//!
//! A method describes the fields it reads as an ordered list of
//! [`FieldSpec`]s. [`validate_params`] stops at the first violation in
//! declaration order; [`validate_all`] walks every field and collects all of
//! them. Neither has side effects.

pub mod path;

use crate::error::ConnectError;

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Non-negative integer given as a number or a decimal string.
    Uint,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Uint => "uint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    /// `None` accepts any JSON type.
    pub field_type: Option<FieldType>,
    pub required: bool,
    pub allow_empty: bool,
    pub allow_negative: bool,
    /// Spec applied to every element when the field is an array.
    pub element: Option<Box<FieldSpec>>,
}

impl FieldSpec {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type: Some(field_type),
            required: false,
            allow_empty: false,
            allow_negative: false,
            element: None,
        }
    }

    pub fn any(name: &'static str) -> Self {
        Self {
            name,
            field_type: None,
            required: false,
            allow_empty: false,
            allow_negative: false,
            element: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn allow_negative(mut self) -> Self {
        self.allow_negative = true;
        self
    }

    pub fn elements(mut self, element: FieldSpec) -> Self {
        self.element = Some(Box::new(element));
        self
    }
}

/// Fail on the first violation, in declaration order.
///
/// Fields not named by any spec are ignored.
pub fn validate_params(input: &Value, specs: &[FieldSpec]) -> Result<(), ConnectError> {
    let fields = as_fields(input);
    for spec in specs {
        check_field(spec.name, fields.and_then(|f| f.get(spec.name)), spec)?;
    }
    Ok(())
}

/// Collect every violation, in declaration order.
pub fn validate_all(input: &Value, specs: &[FieldSpec]) -> Vec<ConnectError> {
    let fields = as_fields(input);
    specs
        .iter()
        .filter_map(|spec| check_field(spec.name, fields.and_then(|f| f.get(spec.name)), spec).err())
        .collect()
}

fn as_fields(input: &Value) -> Option<&Map<String, Value>> {
    input.as_object()
}

#[track_caller]
fn check_field(name: &str, value: Option<&Value>, spec: &FieldSpec) -> Result<(), ConnectError> {
    let value = match value {
        None | Some(Value::Null) => {
            if spec.required {
                return Err(ConnectError::invalid_parameter(format!(
                    "Parameter \"{name}\" is missing."
                )));
            }
            return Ok(());
        }
        Some(value) => value,
    };

    let Some(field_type) = spec.field_type else {
        return Ok(());
    };

    let type_ok = match field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Array => value.is_array(),
        FieldType::Uint => is_uint(value, spec.allow_negative),
    };

    if !type_ok {
        return Err(ConnectError::invalid_parameter(format!(
            "Parameter \"{name}\" has invalid type. \"{field_type}\" expected."
        )));
    }

    // An empty string satisfies an optional field but not a required one.
    if value.as_str() == Some("") && spec.required && !spec.allow_empty {
        return Err(ConnectError::invalid_parameter(format!(
            "Parameter \"{name}\" is empty."
        )));
    }

    if let Value::Array(items) = value {
        if items.is_empty() && !spec.allow_empty {
            return Err(ConnectError::invalid_parameter(format!(
                "Parameter \"{name}\" is empty."
            )));
        }
        if let Some(element) = &spec.element {
            for (index, item) in items.iter().enumerate() {
                check_field(&format!("{name}[{index}]"), Some(item), element)?;
            }
        }
    }

    Ok(())
}

fn is_uint(value: &Value, allow_negative: bool) -> bool {
    let text = match value {
        Value::Number(n) => {
            if n.is_f64() {
                return false;
            }
            n.to_string()
        }
        Value::String(s) => s.clone(),
        _ => return false,
    };

    let digits = match text.strip_prefix('-') {
        Some(rest) if allow_negative => rest,
        Some(_) => return false,
        None => text.as_str(),
    };

    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}
