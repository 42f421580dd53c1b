//! JSON-RPC 2.0 single call protocol
//!
//! Validation failures are answered in-band with an error envelope; only
//! listener failures escape as `ProtocolError`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::errors::{CommandError, ProtocolError};
use crate::ipc::{
    command::CommandExecutor,
    connection::{Connection, ProtocolVersion},
    listeners::CallListener,
    scope::{CallScope, ScopedCall},
    session::SessionProvider,
};
use crate::rpc::{
    arguments::IpcArguments, call::IpcCall, error_code::ErrorCode, Protocol, Reply, ID, JSON_RPC,
    METHOD, PARAMS, RESULT,
};

pub const VERSION: &str = "2.0";

const KEYS: [&[&str]; 4] = [
    // request
    &[JSON_RPC, METHOD, PARAMS, ID],
    // request without params
    &[JSON_RPC, METHOD, ID],
    // notification
    &[JSON_RPC, METHOD, PARAMS],
    // notification without params
    &[JSON_RPC, METHOD],
];

pub struct JsonRpc2Protocol {
    executor: Arc<dyn CommandExecutor>,
    sessions: Arc<dyn SessionProvider>,
    scope: Arc<dyn CallScope>,
    listener: Arc<dyn CallListener>,
}

impl JsonRpc2Protocol {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        sessions: Arc<dyn SessionProvider>,
        scope: Arc<dyn CallScope>,
        listener: Arc<dyn CallListener>,
    ) -> Self {
        Self {
            executor,
            sessions,
            scope,
            listener,
        }
    }

    async fn execute(&self, id: Value, method: &str, call: IpcCall) -> Result<Reply, ProtocolError> {
        self.listener.on_call_create(&call)?;

        let outcome = {
            let mut scoped = ScopedCall::enter(call, self.scope.as_ref(), self.listener.as_ref());
            self.executor.execute(method, scoped.call_mut()).await
        };

        let response = match outcome {
            Ok(_) if id.is_null() => {
                trace!("request was notification, returning no result");
                return Ok(Reply::NoResponse);
            }
            Err(err) if id.is_null() => {
                warn!(method = %method, error = %err, "notification failed");
                return Ok(Reply::NoResponse);
            }
            Ok(result) => {
                trace!(?result, "returning result");
                success(result, id)
            }
            Err(ref err @ CommandError::NotFound(_)) => ErrorCode::MethodNotFound.response(id, err),
            Err(CommandError::Execution(cause)) => {
                ErrorCode::InternalError.response(id, &*cause)
            }
            Err(ref err @ CommandError::Unexpected(_)) => {
                ErrorCode::InternalError.response(id, err)
            }
        };

        Ok(Reply::Message(response))
    }
}

fn success(result: Map<String, Value>, id: Value) -> Value {
    let mut response = Map::new();
    response.insert(JSON_RPC.to_string(), Value::String(VERSION.to_string()));
    response.insert(RESULT.to_string(), Value::Object(result));
    response.insert(ID.to_string(), id);
    Value::Object(response)
}

/// Whether `id` is absent or one of string, integer or boolean.
fn is_valid_id(id: &Value) -> bool {
    match id {
        Value::Null | Value::String(_) | Value::Bool(_) => true,
        Value::Number(number) => number.is_i64(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[async_trait]
impl Protocol for JsonRpc2Protocol {
    fn name(&self) -> &'static str {
        "jsonrpc-2.0"
    }

    fn supports(&self, request: &Value) -> bool {
        let Some(request) = request.as_object() else {
            return false;
        };

        KEYS.iter().any(|keys| {
            request.len() == keys.len() && keys.iter().all(|key| request.contains_key(*key))
        })
    }

    async fn process(
        &self,
        request: &Value,
        connection: &Arc<Connection>,
    ) -> Result<Reply, ProtocolError> {
        trace!(%request, "processing json-rpc 2.0 call");
        let request = request
            .as_object()
            .ok_or(ProtocolError::InvalidRequest("request must be an object"))?;

        let id = request.get(ID).cloned().unwrap_or(Value::Null);
        trace!(%id, "call id");

        if !is_valid_id(&id) {
            return Ok(Reply::Message(ErrorCode::InvalidRequest.message_response(
                id,
                "id must be on of [string, number, boolean]",
            )));
        }

        if request.get(JSON_RPC).and_then(Value::as_str) != Some(VERSION) {
            return Ok(Reply::Message(
                ErrorCode::InvalidRequest.message_response(id, "jsonrpc must be 2.0"),
            ));
        }

        let Some(method) = request.get(METHOD).and_then(Value::as_str) else {
            return Ok(Reply::Message(
                ErrorCode::InvalidRequest.message_response(id, "method must be a string"),
            ));
        };
        trace!(method = %method, "requested method");

        let arguments = match request.get(PARAMS) {
            None => {
                trace!("no params, using empty arguments");
                IpcArguments::new()
            }
            Some(Value::Array(params)) => {
                trace!(?params, "incoming positional params");
                IpcArguments::from_positional(params.clone())
            }
            Some(Value::Object(params)) => {
                trace!(?params, "incoming named params");
                IpcArguments::from_named(params.clone())
            }
            Some(_) => {
                return Ok(Reply::Message(ErrorCode::InvalidParams.message_response(
                    id,
                    "params must be either an array or an object",
                )));
            }
        };

        let session = self.sessions.get_session(connection.id(), None);
        connection.attach_to(session);
        connection.stamp(ProtocolVersion::V2);

        let call = IpcCall::new(arguments, Arc::clone(connection));
        self.execute(id, method, call).await
    }

    fn on_error(&self, error: &ProtocolError, request: &Value) -> Value {
        let id = request.get(ID).cloned().unwrap_or(Value::Null);
        ErrorCode::InternalError.response(id, error)
    }

    fn on_connection_destroy(&self, connection: &Connection) {
        if !connection.is_stamped(ProtocolVersion::V2) {
            return;
        }

        if let Some(session) = connection.session() {
            session.clear();
        }
    }
}
