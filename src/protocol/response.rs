use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::{RpcId, JSONRPC_VERSION};
use crate::error::ProtocolError;

/// JSON-RPC 2.0 error object returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The two mutually exclusive outcomes a response can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Result(Value),
    Error(JsonRpcError),
}

/// A parsed JSON-RPC 2.0 response envelope.
///
/// `raw` keeps the full object as received so failures can be reported with
/// the exact payload.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub id: Option<Value>,
    pub payload: ResponsePayload,
    pub raw: Value,
}

impl JsonRpcResponse {
    /// Parse one response line.
    ///
    /// A `result` key counts as present even when its value is `null`; an
    /// `error` key whose value is `null` counts as absent.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let raw: Value = serde_json::from_str(line)?;
        let obj = raw.as_object().ok_or(ProtocolError::NotAnObject)?;

        check_version(obj)?;

        let result = obj.get("result");
        let error = obj.get("error").filter(|e| !e.is_null());

        let payload = match (result, error) {
            (Some(_), Some(_)) => return Err(ProtocolError::BothResultAndError),
            (None, None) => return Err(ProtocolError::NeitherResultNorError),
            (Some(r), None) => ResponsePayload::Result(r.clone()),
            (None, Some(e)) => ResponsePayload::Error(
                serde_json::from_value(e.clone())
                    .map_err(|e| ProtocolError::MalformedError(e.to_string()))?,
            ),
        };

        Ok(Self {
            id: obj.get("id").cloned(),
            payload,
            raw,
        })
    }

    /// Check that this response answers the request with `expected` id.
    pub fn ensure_id(&self, expected: &RpcId) -> Result<(), ProtocolError> {
        let matches = match (&self.id, expected) {
            (Some(Value::Number(n)), RpcId::Number(e)) => n.as_i64() == Some(*e),
            (Some(Value::String(s)), RpcId::Str(e)) => s == e,
            _ => false,
        };
        if matches {
            return Ok(());
        }
        Err(ProtocolError::IdMismatch {
            expected: expected.clone(),
            actual: match &self.id {
                Some(v) => v.to_string(),
                None => "<missing>".into(),
            },
        })
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(v) => Some(v),
            ResponsePayload::Error(_) => None,
        }
    }
}

fn check_version(obj: &Map<String, Value>) -> Result<(), ProtocolError> {
    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => Ok(()),
        Some(other) => Err(ProtocolError::WrongVersion(other.to_string())),
        None => Err(ProtocolError::WrongVersion("<missing>".into())),
    }
}
