//! JSON-RPC 2.0 batch protocol
//!
//! Each element goes through the single call protocol in order. A failing
//! element is rendered in its own slot and never aborts the rest of the batch.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::errors::ProtocolError;
use crate::ipc::connection::Connection;
use crate::rpc::{error_code::ErrorCode, v2::JsonRpc2Protocol, Protocol, Reply};

pub struct JsonRpc2BatchProtocol {
    protocol: Arc<JsonRpc2Protocol>,
}

impl JsonRpc2BatchProtocol {
    pub fn new(protocol: Arc<JsonRpc2Protocol>) -> Self {
        Self { protocol }
    }
}

#[async_trait]
impl Protocol for JsonRpc2BatchProtocol {
    fn name(&self) -> &'static str {
        "jsonrpc-2.0-batch"
    }

    fn supports(&self, request: &Value) -> bool {
        request
            .as_array()
            .is_some_and(|requests| requests.iter().all(|item| self.protocol.supports(item)))
    }

    async fn process(
        &self,
        request: &Value,
        connection: &Arc<Connection>,
    ) -> Result<Reply, ProtocolError> {
        trace!(%request, "processing json-rpc 2.0 batch call");
        let requests = request
            .as_array()
            .ok_or(ProtocolError::InvalidRequest("batch must be an array"))?;

        let mut replies = Vec::with_capacity(requests.len());
        for item in requests {
            let reply = match self.protocol.process(item, connection).await {
                Ok(reply) => reply,
                Err(err) => Reply::Message(self.protocol.on_error(&err, item)),
            };
            replies.push(reply);
        }

        Ok(Reply::Batch(replies))
    }

    fn on_error(&self, error: &ProtocolError, _request: &Value) -> Value {
        ErrorCode::InternalError.response(Value::Null, error)
    }
}
