use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{errors::CommandError, rpc::call::IpcCall};

/// Runs the business logic behind a named remote method.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        method: &str,
        call: &mut IpcCall,
    ) -> Result<Map<String, Value>, CommandError>;
}

#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(
        &self,
        call: &mut IpcCall,
        result: &mut Map<String, Value>,
    ) -> Result<(), CommandError>;
}

#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, name: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.register(name, command);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.insert(name.into(), command);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

#[async_trait]
impl CommandExecutor for CommandRegistry {
    async fn execute(
        &self,
        method: &str,
        call: &mut IpcCall,
    ) -> Result<Map<String, Value>, CommandError> {
        let command = self
            .commands
            .get(method)
            .ok_or_else(|| CommandError::NotFound(method.to_string()))?;

        trace!(method = %method, call = call.id(), "executing command");
        let mut result = Map::new();
        command.execute(call, &mut result).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        domain::echo::Echo, ipc::connection::Connection, rpc::arguments::IpcArguments,
    };

    fn call() -> IpcCall {
        IpcCall::new(
            IpcArguments::from_positional(vec![json!("hi")]),
            Arc::new(Connection::new("c")),
        )
    }

    #[tokio::test]
    async fn registry_runs_registered_command() {
        let registry = CommandRegistry::new().with_command("Echo", Arc::new(Echo));
        let result = registry
            .execute("Echo", &mut call())
            .await
            .expect("echo succeeds");

        assert_eq!(Value::Object(result), json!({"0": "hi"}));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Echo"]);
    }

    #[tokio::test]
    async fn registry_reports_unknown_method() {
        let registry = CommandRegistry::new();
        let err = registry
            .execute("Missing", &mut call())
            .await
            .expect_err("unknown method must fail");

        assert!(matches!(err, CommandError::NotFound(ref method) if method == "Missing"));
    }
}
