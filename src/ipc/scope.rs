//! Per-call scope entered around command execution
//!
//! `ScopedCall` pairs every `enter` with an `exit`: dropping the guard exits the
//! scope, fires the destroy notification and clears the call, in that order.

use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use tracing::{trace, warn};

use crate::{ipc::listeners::CallListener, rpc::call::IpcCall};

pub trait CallScope: Send + Sync {
    fn enter(&self, call: &IpcCall);
    fn exit(&self, call: &IpcCall);
}

/// Tracks which calls are currently inside their scope.
#[derive(Debug, Default)]
pub struct ActiveCallScope {
    active: Mutex<HashSet<u64>>,
}

impl ActiveCallScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, call_id: u64) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&call_id)
    }

    pub fn active_calls(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CallScope for ActiveCallScope {
    fn enter(&self, call: &IpcCall) {
        trace!(call = call.id(), "entering call scope");
        let newly_entered = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call.id());
        if !newly_entered {
            warn!(call = call.id(), "call scope entered twice");
        }
    }

    fn exit(&self, call: &IpcCall) {
        trace!(call = call.id(), "exiting call scope");
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&call.id());
    }
}

pub struct ScopedCall<'a> {
    call: IpcCall,
    scope: &'a dyn CallScope,
    listener: &'a dyn CallListener,
}

impl<'a> ScopedCall<'a> {
    pub fn enter(call: IpcCall, scope: &'a dyn CallScope, listener: &'a dyn CallListener) -> Self {
        scope.enter(&call);
        Self {
            call,
            scope,
            listener,
        }
    }

    pub fn call(&self) -> &IpcCall {
        &self.call
    }

    pub fn call_mut(&mut self) -> &mut IpcCall {
        &mut self.call
    }
}

impl Drop for ScopedCall<'_> {
    fn drop(&mut self) {
        self.scope.exit(&self.call);
        if let Err(err) = self.listener.on_call_destroy(&self.call) {
            warn!(call = self.call.id(), error = %err, "call destroy listener failed");
        }
        self.call.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::{errors::ListenerError, ipc::connection::Connection, rpc::arguments::IpcArguments};

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, event: String) {
            self.events.lock().expect("journal lock").push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().expect("journal lock").clone()
        }
    }

    impl CallScope for Journal {
        fn enter(&self, _call: &IpcCall) {
            self.push("enter".to_string());
        }

        fn exit(&self, _call: &IpcCall) {
            self.push("exit".to_string());
        }
    }

    impl CallListener for Journal {
        fn on_call_destroy(&self, call: &IpcCall) -> Result<(), ListenerError> {
            self.push(format!("destroy context={}", call.has_context()));
            Err(ListenerError::new("journal", "ignored"))
        }
    }

    #[test]
    fn guard_exits_then_notifies_then_clears() {
        let journal = Journal::default();
        let call = IpcCall::new(IpcArguments::new(), Arc::new(Connection::new("c")));
        {
            let mut scoped = ScopedCall::enter(call, &journal, &journal);
            scoped.call_mut().context_set("k", json!(1));
            assert!(scoped.call().has_context());
        }

        assert_eq!(
            journal.events(),
            vec!["enter", "exit", "destroy context=true"]
        );
    }

    #[test]
    fn active_scope_tracks_entered_calls() {
        let scope = ActiveCallScope::new();
        let listener = crate::ipc::listeners::CallListeners::new();
        let call = IpcCall::new(IpcArguments::new(), Arc::new(Connection::new("c")));
        let id = call.id();

        let scoped = ScopedCall::enter(call, &scope, &listener);
        assert!(scope.is_active(id));
        assert_eq!(scope.active_calls(), 1);

        drop(scoped);
        assert!(!scope.is_active(id));
        assert_eq!(scope.active_calls(), 0);
    }
}
