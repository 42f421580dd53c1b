//! Session storage shared by every call made over a connection

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    values: Mutex<HashMap<String, Value>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.lock().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        debug!(session = %self.id, "clearing session");
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub trait SessionProvider: Send + Sync {
    /// Returns the session for the given key pair, creating it on first use.
    fn get_session(&self, connection_id: &str, secondary_key: Option<&str>) -> Arc<Session>;

    /// Forgets every session keyed by `connection_id`.
    fn remove(&self, connection_id: &str);
}

#[derive(Debug, Default)]
pub struct InMemorySessionProvider {
    sessions: Mutex<HashMap<(String, Option<String>), Arc<Session>>>,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionProvider for InMemorySessionProvider {
    fn get_session(&self, connection_id: &str, secondary_key: Option<&str>) -> Arc<Session> {
        let key = (connection_id.to_string(), secondary_key.map(str::to_string));
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(key).or_insert_with(|| {
            let id = match secondary_key {
                Some(secondary) => format!("{connection_id}:{secondary}"),
                None => connection_id.to_string(),
            };
            debug!(session = %id, "creating session");
            Arc::new(Session::new(id))
        });
        Arc::clone(session)
    }

    fn remove(&self, connection_id: &str) {
        let now = Utc::now();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(owner, _), session| {
                if owner != connection_id {
                    return true;
                }
                let age_ms = (now - session.created_at()).num_milliseconds();
                debug!(session = %session.id(), age_ms, "removing session");
                false
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_returns_same_session_for_same_key() {
        let provider = InMemorySessionProvider::new();
        let first = provider.get_session("conn-1", None);
        first.set("user", json!("alice"));

        let second = provider.get_session("conn-1", None);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("user"), Some(json!("alice")));
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn secondary_key_separates_sessions() {
        let provider = InMemorySessionProvider::new();
        let plain = provider.get_session("conn-1", None);
        let keyed = provider.get_session("conn-1", Some("bob"));

        assert!(!Arc::ptr_eq(&plain, &keyed));
        assert_eq!(keyed.id(), "conn-1:bob");
    }

    #[test]
    fn remove_forgets_every_session_of_a_connection() {
        let provider = InMemorySessionProvider::new();
        let plain = provider.get_session("conn-1", None);
        provider.get_session("conn-1", Some("bob"));
        provider.get_session("conn-2", None);
        plain.set("user", json!("alice"));

        provider.remove("conn-1");
        assert_eq!(provider.len(), 1);

        let fresh = provider.get_session("conn-1", None);
        assert!(!Arc::ptr_eq(&plain, &fresh));
        assert!(fresh.is_empty());

        provider.remove("conn-1");
        provider.remove("conn-2");
        assert!(provider.is_empty());
    }

    #[test]
    fn clear_drops_all_values() {
        let session = Session::new("s");
        session.set("a", json!(1));
        session.set("b", json!(2));
        assert_eq!(session.remove("a"), Some(json!(1)));

        session.clear();
        assert!(session.is_empty());
        assert!(session.get("b").is_none());
    }
}
