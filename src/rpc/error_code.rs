//! Protocol error codes and the error envelopes built from them

use std::error::Error;

use serde_json::{json, Map, Value};

use crate::rpc::{CODE, DATA, ERROR, ID, MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request body could not be decoded.
    ParseError,
    /// The value is not a valid request object.
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => 32700,
            Self::InvalidRequest => 32600,
            Self::MethodNotFound => 32601,
            Self::InvalidParams => 32602,
            Self::InternalError => 32603,
        }
    }

    /// `{"error": {"code", "message", "data"}, "id"}` describing `cause`.
    pub fn response(self, id: Value, cause: &(dyn Error + 'static)) -> Value {
        let mut error = Map::new();
        error.insert(CODE.to_string(), json!(self.code()));
        error.insert(MESSAGE.to_string(), Value::String(cause.to_string()));
        error.insert(DATA.to_string(), failure_data(cause));
        envelope(error, id)
    }

    /// `{"error": {"code", "message"}, "id"}` with a fixed message and no data.
    pub fn message_response(self, id: Value, message: &str) -> Value {
        let mut error = Map::new();
        error.insert(CODE.to_string(), json!(self.code()));
        error.insert(MESSAGE.to_string(), Value::String(message.to_string()));
        envelope(error, id)
    }
}

fn envelope(error: Map<String, Value>, id: Value) -> Value {
    let mut response = Map::new();
    response.insert(ERROR.to_string(), Value::Object(error));
    response.insert(ID.to_string(), id);
    Value::Object(response)
}

/// Structured form of a failure, used wherever a raw cause ends up on the wire.
pub fn failure_data(cause: &(dyn Error + 'static)) -> Value {
    let causes: Vec<Value> = std::iter::successors(cause.source(), |&err| err.source())
        .map(|err| Value::String(err.to_string()))
        .collect();

    if causes.is_empty() {
        json!({ "message": cause.to_string() })
    } else {
        json!({ "message": cause.to_string(), "causes": causes })
    }
}
