//! JSON-RPC 1.0 single call protocol
//!
//! Requests carry exactly `method`, `params` and `id`. Malformed method or
//! params fail the request with a `ProtocolError` so that another protocol may
//! take over; command failures are answered with the raw cause in `error`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::errors::ProtocolError;
use crate::ipc::{
    command::CommandExecutor,
    connection::{Connection, ProtocolVersion},
    listeners::CallListeners,
    scope::{CallScope, ScopedCall},
    session::SessionProvider,
};
use crate::rpc::{
    arguments::IpcArguments, call::IpcCall, error_code::failure_data, Protocol, Reply, ERROR, ID,
    METHOD, PARAMS, RESULT,
};

const METHOD_ERROR: &str = "method must be a string";
const PARAMS_ERROR: &str = "params must be an array";

const KEYS: [&str; 3] = [METHOD, PARAMS, ID];

pub struct JsonRpcProtocol {
    executor: Arc<dyn CommandExecutor>,
    sessions: Arc<dyn SessionProvider>,
    scope: Arc<dyn CallScope>,
    listeners: Arc<CallListeners>,
}

impl JsonRpcProtocol {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        sessions: Arc<dyn SessionProvider>,
        scope: Arc<dyn CallScope>,
        listeners: Arc<CallListeners>,
    ) -> Self {
        Self {
            executor,
            sessions,
            scope,
            listeners,
        }
    }
}

fn envelope(result: Value, error: Value, id: Value) -> Value {
    let mut response = Map::new();
    response.insert(RESULT.to_string(), result);
    response.insert(ERROR.to_string(), error);
    response.insert(ID.to_string(), id);
    Value::Object(response)
}

#[async_trait]
impl Protocol for JsonRpcProtocol {
    fn name(&self) -> &'static str {
        "jsonrpc-1.0"
    }

    fn supports(&self, request: &Value) -> bool {
        request.as_object().is_some_and(|request| {
            request.len() == KEYS.len() && KEYS.iter().all(|key| request.contains_key(*key))
        })
    }

    async fn process(
        &self,
        request: &Value,
        connection: &Arc<Connection>,
    ) -> Result<Reply, ProtocolError> {
        trace!(%request, "processing json-rpc 1.0 call");
        let request = request
            .as_object()
            .ok_or(ProtocolError::InvalidRequest("request must be an object"))?;

        let method = request
            .get(METHOD)
            .and_then(Value::as_str)
            .ok_or(ProtocolError::InvalidRequest(METHOD_ERROR))?;
        trace!(method = %method, "requested method");

        let params = request
            .get(PARAMS)
            .and_then(Value::as_array)
            .ok_or(ProtocolError::InvalidRequest(PARAMS_ERROR))?;
        trace!(?params, "incoming params");

        let id = request.get(ID).cloned().unwrap_or(Value::Null);
        trace!(%id, "call id");

        let arguments = IpcArguments::from_positional(params.clone());

        let session = self.sessions.get_session(connection.id(), None);
        connection.attach_to(session);
        connection.stamp(ProtocolVersion::V1);

        let call = IpcCall::new(arguments, Arc::clone(connection));
        self.listeners.notify_create(&call)?;

        let outcome = {
            let mut scoped = ScopedCall::enter(call, self.scope.as_ref(), self.listeners.as_ref());
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
                envelope(Value::Object(result), Value::Null, id)
            }
            Err(err) => envelope(Value::Null, failure_data(&err), id),
        };

        Ok(Reply::Message(response))
    }

    fn on_error(&self, error: &ProtocolError, request: &Value) -> Value {
        let id = request.get(ID).cloned().unwrap_or(Value::Null);
        envelope(Value::Null, failure_data(error), id)
    }

    fn on_connection_destroy(&self, connection: &Connection) {
        if !connection.is_stamped(ProtocolVersion::V1) {
            return;
        }

        if let Some(session) = connection.session() {
            session.clear();
        }
    }
}
