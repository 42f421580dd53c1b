//! JSON-RPC 1.0 and 2.0 protocol engine
//!
//! Every protocol recognizes a decoded request through `supports`, executes it
//! through the command executor and renders the response in its own envelope.
//! `ProtocolRegistry` tries the registered protocols in turn.

pub mod arguments;
pub mod batch;
pub mod call;
pub mod error_code;
#[cfg(test)]
pub(crate) mod testing;
pub mod v1;
pub mod v2;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ProtocolError;
use crate::ipc::{
    command::CommandExecutor, connection::Connection, listeners::CallListeners, scope::CallScope,
    session::SessionProvider,
};
use crate::rpc::{
    batch::JsonRpc2BatchProtocol, error_code::ErrorCode, v1::JsonRpcProtocol,
    v2::JsonRpc2Protocol,
};

pub const JSON_RPC: &str = "jsonrpc";
pub const METHOD: &str = "method";
pub const PARAMS: &str = "params";
pub const ID: &str = "id";
pub const RESULT: &str = "result";
pub const ERROR: &str = "error";
pub const CODE: &str = "code";
pub const MESSAGE: &str = "message";
pub const DATA: &str = "data";

/// What a protocol hands back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Message(Value),
    Batch(Vec<Reply>),
    /// The request was a notification; nothing goes on the wire.
    NoResponse,
}

impl Reply {
    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::NoResponse)
    }

    /// Wire payload for this reply. Notifications inside a batch are dropped and a
    /// batch made only of notifications yields no payload at all.
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Message(value) => Some(value),
            Self::NoResponse => None,
            Self::Batch(replies) => {
                let values: Vec<Value> = replies.into_iter().filter_map(Reply::into_payload).collect();
                if values.is_empty() {
                    None
                } else {
                    Some(Value::Array(values))
                }
            }
        }
    }
}

#[async_trait]
pub trait Protocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, request: &Value) -> bool;

    async fn process(
        &self,
        request: &Value,
        connection: &Arc<Connection>,
    ) -> Result<Reply, ProtocolError>;

    fn on_error(&self, error: &ProtocolError, request: &Value) -> Value;

    fn on_connection_destroy(&self, _connection: &Connection) {}
}

/// Shared collaborators every protocol is built from.
#[derive(Clone)]
pub struct Services {
    pub executor: Arc<dyn CommandExecutor>,
    pub sessions: Arc<dyn SessionProvider>,
    pub scope: Arc<dyn CallScope>,
    pub listeners: Arc<CallListeners>,
}

pub struct ProtocolRegistry {
    protocols: Vec<Arc<dyn Protocol>>,
    sessions: Arc<dyn SessionProvider>,
}

impl ProtocolRegistry {
    /// Registers JSON-RPC 2.0, its batch variant and, when enabled, JSON-RPC 1.0.
    pub fn new(services: Services, enable_v1: bool) -> Self {
        let v2 = Arc::new(JsonRpc2Protocol::new(
            Arc::clone(&services.executor),
            Arc::clone(&services.sessions),
            Arc::clone(&services.scope),
            services.listeners.clone(),
        ));

        let sessions = Arc::clone(&services.sessions);
        let mut protocols: Vec<Arc<dyn Protocol>> = vec![
            v2.clone() as Arc<dyn Protocol>,
            Arc::new(JsonRpc2BatchProtocol::new(v2)),
        ];

        if enable_v1 {
            protocols.push(Arc::new(JsonRpcProtocol::new(
                services.executor,
                services.sessions,
                services.scope,
                services.listeners,
            )));
        }

        Self {
            protocols,
            sessions,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.protocols.iter().map(|protocol| protocol.name()).collect()
    }

    pub async fn dispatch(&self, request: &Value, connection: &Arc<Connection>) -> Reply {
        let mut last_failure: Option<(&Arc<dyn Protocol>, ProtocolError)> = None;

        for protocol in self.protocols.iter().filter(|p| p.supports(request)) {
            debug!(protocol = protocol.name(), connection = %connection.id(), "dispatching request");
            match protocol.process(request, connection).await {
                Ok(reply) => return reply,
                Err(err) => {
                    warn!(protocol = protocol.name(), error = %err, "protocol rejected request");
                    last_failure = Some((protocol, err));
                }
            }
        }

        match last_failure {
            Some((protocol, err)) => Reply::Message(protocol.on_error(&err, request)),
            None => {
                let id = request.get(ID).cloned().unwrap_or(Value::Null);
                Reply::Message(ErrorCode::InvalidRequest.message_response(id, "unsupported request"))
            }
        }
    }

    /// Runs every protocol's teardown hook, then drops the sessions keyed by
    /// the connection.
    pub fn connection_destroyed(&self, connection: &Connection) {
        debug!(connection = %connection.id(), "running connection teardown hooks");
        for protocol in &self.protocols {
            protocol.on_connection_destroy(connection);
        }
        self.sessions.remove(connection.id());
    }
}
