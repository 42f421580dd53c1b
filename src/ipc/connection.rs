//! Client connections and the protocol-version markers stamped on them

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::ipc::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

impl ProtocolVersion {
    pub const fn marker_key(self) -> &'static str {
        match self {
            Self::V1 => "jsonrpc.protocol.v1",
            Self::V2 => "jsonrpc.protocol.v2",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "Json-RPC 1.0",
            Self::V2 => "Json-RPC 2.0",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Connection {
    id: String,
    created_at: DateTime<Utc>,
    session: Mutex<Option<Arc<Session>>>,
    markers: Mutex<HashMap<&'static str, ProtocolVersion>>,
}

impl Connection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            session: Mutex::new(None),
            markers: Mutex::new(HashMap::new()),
        }
    }

    /// A connection that lives for a single request and is never registered.
    pub fn transient() -> Self {
        Self::new(generate_id())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn attach_to(&self, session: Arc<Session>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stamps `version` under its own marker key. An existing marker is never replaced.
    pub fn stamp(&self, version: ProtocolVersion) {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(version.marker_key())
            .or_insert(version);
    }

    pub fn marker(&self, key: &str) -> Option<ProtocolVersion> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    pub fn is_stamped(&self, version: ProtocolVersion) -> bool {
        self.marker(version.marker_key()) == Some(version)
    }
}

fn generate_id() -> String {
    format!("conn-{}", Uuid::new_v4().simple())
}

/// Connections a client asked to keep alive across requests, addressable by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the connection registered under `id`, registering it on first use.
    /// A missing or blank id yields a transient connection that the caller must
    /// tear down itself once the request is answered.
    pub fn resolve(&self, id: Option<&str>) -> Resolved {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Resolved::Transient(Arc::new(Connection::transient()));
        };

        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let connection = connections.entry(id.to_string()).or_insert_with_key(|id| {
            debug!(connection = %id, "opening connection");
            Arc::new(Connection::new(id.clone()))
        });
        Resolved::Registered(Arc::clone(connection))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub enum Resolved {
    Registered(Arc<Connection>),
    Transient(Arc<Connection>),
}

impl Resolved {
    pub fn connection(&self) -> &Arc<Connection> {
        match self {
            Self::Registered(connection) | Self::Transient(connection) => connection,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
