use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::{errors::ListenerError, rpc::call::IpcCall};

/// Observer of call creation and destruction.
pub trait CallListener: Send + Sync {
    fn on_call_create(&self, _call: &IpcCall) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_call_destroy(&self, _call: &IpcCall) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Registry of call listeners that broadcasts every notification.
#[derive(Default)]
pub struct CallListeners {
    listeners: RwLock<Vec<Arc<dyn CallListener>>>,
}

impl CallListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn CallListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies listeners in registration order and stops at the first failure.
    pub fn notify_create(&self, call: &IpcCall) -> Result<(), ListenerError> {
        self.snapshot()
            .iter()
            .try_for_each(|listener| listener.on_call_create(call))
    }

    /// Notifies every listener. Failures are logged and never stop the broadcast.
    pub fn notify_destroy_silent(&self, call: &IpcCall) {
        for listener in self.snapshot() {
            if let Err(err) = listener.on_call_destroy(call) {
                warn!(call = call.id(), error = %err, "call destroy listener failed");
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn CallListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CallListener for CallListeners {
    fn on_call_create(&self, call: &IpcCall) -> Result<(), ListenerError> {
        self.notify_create(call)
    }

    fn on_call_destroy(&self, call: &IpcCall) -> Result<(), ListenerError> {
        self.notify_destroy_silent(call);
        Ok(())
    }
}
