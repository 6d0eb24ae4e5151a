//! Result envelope returned for every call.
//!
//! The JSON shape is fixed: `{success:true, id, payload}` or
//! `{success:false, payload:{error, code?}}`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallResponse {
    Success { id: u64, payload: Value },
    Unsuccessful { payload: FailurePayload },
}

impl CallResponse {
    pub fn success(id: u64, payload: Value) -> Self {
        CallResponse::Success { id, payload }
    }

    pub fn failure(error: impl Into<String>, code: Option<&str>) -> Self {
        CallResponse::Unsuccessful {
            payload: FailurePayload {
                error: error.into(),
                code: code.map(str::to_string),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallResponse::Success { .. })
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            CallResponse::Success { .. } => None,
            CallResponse::Unsuccessful { payload } => payload.code.as_deref(),
        }
    }
}

impl Serialize for CallResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CallResponse::Success { id, payload } => {
                let mut state = serializer.serialize_struct("Success", 3)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("id", id)?;
                state.serialize_field("payload", payload)?;
                state.end()
            }
            CallResponse::Unsuccessful { payload } => {
                let mut state = serializer.serialize_struct("Unsuccessful", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("payload", payload)?;
                state.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    id: Option<u64>,
    payload: Value,
}

impl<'de> Deserialize<'de> for CallResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        if raw.success {
            let id = raw
                .id
                .ok_or_else(|| serde::de::Error::missing_field("id"))?;
            Ok(CallResponse::Success {
                id,
                payload: raw.payload,
            })
        } else {
            let payload =
                FailurePayload::deserialize(raw.payload).map_err(serde::de::Error::custom)?;
            Ok(CallResponse::Unsuccessful { payload })
        }
    }
}
