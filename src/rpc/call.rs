use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::Value;

use crate::{ipc::connection::Connection, rpc::arguments::IpcArguments};

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Per-request call context: the normalized arguments, the originating
/// connection and a lazily created scratch store for scope collaborators.
#[derive(Debug)]
pub struct IpcCall {
    id: u64,
    arguments: IpcArguments,
    connection: Arc<Connection>,
    context: Option<HashMap<String, Value>>,
}

impl IpcCall {
    pub fn new(arguments: IpcArguments, connection: Arc<Connection>) -> Self {
        Self {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            arguments,
            connection,
            context: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn arguments(&self) -> &IpcArguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut IpcArguments {
        &mut self.arguments
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn context_get(&self, key: &str) -> Option<&Value> {
        self.context.as_ref()?.get(key)
    }

    pub fn context_set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value)
    }

    pub fn context_remove(&mut self, key: &str) -> Option<Value> {
        self.context.as_mut()?.remove(key)
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn clear(&mut self) {
        self.context = None;
    }
}
