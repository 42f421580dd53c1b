use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{errors::CommandError, ipc::command::Command, rpc::call::IpcCall};

/// Copies every argument of the call into the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

#[async_trait]
impl Command for Echo {
    async fn execute(
        &self,
        call: &mut IpcCall,
        result: &mut Map<String, Value>,
    ) -> Result<(), CommandError> {
        trace!(arguments = ?call.arguments(), "echoing arguments");
        result.extend(
            call.arguments()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{ipc::connection::Connection, rpc::arguments::IpcArguments};

    #[tokio::test]
    async fn echo_copies_named_arguments() {
        let mut params = Map::new();
        params.insert("msg".to_string(), json!("hi"));
        let mut call = IpcCall::new(
            IpcArguments::from_named(params),
            Arc::new(Connection::new("c")),
        );
        call.arguments_mut().insert("added", json!(1));

        let mut result = Map::new();
        Echo.execute(&mut call, &mut result)
            .await
            .expect("echo never fails");

        assert_eq!(Value::Object(result), json!({"msg": "hi", "added": 1}));
    }
}
