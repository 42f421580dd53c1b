//! Recording test doubles shared by the protocol tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::{CommandError, ListenerError};
use crate::ipc::{
    command::CommandExecutor, connection::Connection, listeners::CallListener,
    listeners::CallListeners, scope::CallScope, session::InMemorySessionProvider,
};
use crate::rpc::{
    batch::JsonRpc2BatchProtocol, call::IpcCall, v1::JsonRpcProtocol, v2::JsonRpc2Protocol,
    ProtocolRegistry, Services,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, event: impl Into<String>) {
    journal.lock().expect("journal lock").push(event.into());
}

pub(crate) struct RecordingScope {
    journal: Journal,
    entered: AtomicUsize,
    exited: AtomicUsize,
}

impl CallScope for RecordingScope {
    fn enter(&self, _call: &IpcCall) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, "enter");
    }

    fn exit(&self, _call: &IpcCall) {
        self.exited.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, "exit");
    }
}

pub(crate) struct RecordingListener {
    journal: Journal,
    fail_create: bool,
}

impl CallListener for RecordingListener {
    fn on_call_create(&self, _call: &IpcCall) -> Result<(), ListenerError> {
        if self.fail_create {
            return Err(ListenerError::new("recording", "create rejected"));
        }
        record(&self.journal, "create");
        Ok(())
    }

    fn on_call_destroy(&self, call: &IpcCall) -> Result<(), ListenerError> {
        record(
            &self.journal,
            format!("destroy context={}", call.has_context()),
        );
        Ok(())
    }
}

/// Knows `Echo`, `Stash` (writes to the call context), `Fail` and `Crash`.
pub(crate) struct ScriptedExecutor {
    journal: Journal,
    executed: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        method: &str,
        call: &mut IpcCall,
    ) -> Result<Map<String, Value>, CommandError> {
        self.executed
            .lock()
            .expect("executed lock")
            .push(method.to_string());
        record(&self.journal, format!("execute {method}"));

        match method {
            "Echo" => Ok(call
                .arguments()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()),
            "Stash" => {
                call.context_set("stash", Value::Bool(true));
                Ok(Map::new())
            }
            "Fail" => Err(CommandError::execution("boom")),
            "Crash" => Err(CommandError::unexpected("invariant violated")),
            other => Err(CommandError::NotFound(other.to_string())),
        }
    }
}

pub(crate) struct Harness {
    pub connection: Arc<Connection>,
    pub sessions: Arc<InMemorySessionProvider>,
    journal: Journal,
    scope: Arc<RecordingScope>,
    listeners: Arc<CallListeners>,
    executor: Arc<ScriptedExecutor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_failing_create() -> Self {
        Self::build(true)
    }

    fn build(fail_create: bool) -> Self {
        let journal: Journal = Arc::default();
        let listeners = Arc::new(CallListeners::new());
        listeners.register(Arc::new(RecordingListener {
            journal: journal.clone(),
            fail_create,
        }));

        Self {
            connection: Arc::new(Connection::new("test-connection")),
            sessions: Arc::new(InMemorySessionProvider::new()),
            scope: Arc::new(RecordingScope {
                journal: journal.clone(),
                entered: AtomicUsize::new(0),
                exited: AtomicUsize::new(0),
            }),
            executor: Arc::new(ScriptedExecutor {
                journal: journal.clone(),
                executed: Mutex::new(Vec::new()),
            }),
            listeners,
            journal,
        }
    }

    pub fn services(&self) -> Services {
        Services {
            executor: self.executor.clone(),
            sessions: self.sessions.clone(),
            scope: self.scope.clone(),
            listeners: self.listeners.clone(),
        }
    }

    pub fn v2(&self) -> JsonRpc2Protocol {
        JsonRpc2Protocol::new(
            self.executor.clone(),
            self.sessions.clone(),
            self.scope.clone(),
            self.listeners.clone(),
        )
    }

    pub fn v1(&self) -> JsonRpcProtocol {
        JsonRpcProtocol::new(
            self.executor.clone(),
            self.sessions.clone(),
            self.scope.clone(),
            self.listeners.clone(),
        )
    }

    pub fn batch(&self) -> JsonRpc2BatchProtocol {
        JsonRpc2BatchProtocol::new(Arc::new(self.v2()))
    }

    pub fn registry(&self, enable_v1: bool) -> ProtocolRegistry {
        ProtocolRegistry::new(self.services(), enable_v1)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().expect("journal lock").clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executor.executed.lock().expect("executed lock").clone()
    }

    pub fn destroyed(&self) -> usize {
        self.journal()
            .iter()
            .filter(|event| event.starts_with("destroy"))
            .count()
    }

    pub fn scope_is_balanced(&self) -> bool {
        self.scope.entered.load(Ordering::SeqCst) == self.scope.exited.load(Ordering::SeqCst)
    }
}
