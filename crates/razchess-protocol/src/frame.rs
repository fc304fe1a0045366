//! JSON-RPC 2.0 frame types.
//!
//! Outbound frames are plain serde structs ([`Request`], [`Notification`],
//! [`Response`]). Inbound frames are classified by [`Incoming::from_value`],
//! which inspects keys rather than deriving an untagged enum so that a
//! `"result": null` response is still recognised as a response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// The only protocol version this crate speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// Error code used when the server sent a bare string instead of an error
/// object.
pub const SERVER_ERROR_CODE: i64 = -32000;

fn version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A method call that expects a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "version")]
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: version(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A method call without an id; the peer never answers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default = "version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: version(),
            method: method.into(),
            params,
        }
    }
}

/// The reply to a request. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: version(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl<'de> Deserialize<'de> for ErrorObject {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Some servers put a plain string in `error`.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Object {
                code: i64,
                message: String,
                #[serde(default)]
                data: Option<Value>,
            },
            Text(String),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Object {
                code,
                message,
                data,
            } => ErrorObject {
                code,
                message,
                data,
            },
            Shape::Text(message) => ErrorObject::new(SERVER_ERROR_CODE, message),
        })
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// The answer to one of our requests.
    Response {
        id: u64,
        outcome: Result<Value, ErrorObject>,
    },
    /// A server push that expects no answer.
    Notification { method: String, params: Value },
    /// A server push that expects an answer with the same id.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
}

impl Incoming {
    /// Parses and classifies the text of one frame.
    #[cfg(feature = "json")]
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Decode)?;
        Self::from_value(value)
    }

    /// Classifies an already-decoded frame.
    ///
    /// A frame with a `method` is a request (non-null `id`) or a
    /// notification. A frame without one must carry a numeric `id` and is a
    /// response; a non-null `error` wins over `result`.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = value else {
            return Err(ProtocolError::InvalidMessage("frame is not an object".into()));
        };

        let id = map.remove("id").filter(|id| !id.is_null());

        if let Some(method) = map.remove("method") {
            let Value::String(method) = method else {
                return Err(ProtocolError::InvalidMessage("method is not a string".into()));
            };
            let params = map.remove("params").unwrap_or(Value::Null);
            return Ok(match id {
                Some(id) => Incoming::Request { id, method, params },
                None => Incoming::Notification { method, params },
            });
        }

        let id = match id {
            Some(Value::Number(n)) => n.as_u64(),
            _ => None,
        }
        .ok_or_else(|| {
            ProtocolError::InvalidMessage("response without a numeric id".into())
        })?;

        let outcome = match map.remove("error").filter(|e| !e.is_null()) {
            Some(error) => Err(ErrorObject::deserialize(error).map_err(|e| {
                ProtocolError::InvalidMessage(format!("malformed error object: {e}"))
            })?),
            None => Ok(map.remove("result").unwrap_or(Value::Null)),
        };

        Ok(Incoming::Response { id, outcome })
    }
}

/// Unwraps positional params that hold a single argument.
///
/// Servers send `Session.Update` as `[update]`; handlers want `update`.
pub fn unwrap_params(params: Value) -> Value {
    match params {
        Value::Array(mut items) if items.len() == 1 => items.pop().unwrap_or(Value::Null),
        other => other,
    }
}
