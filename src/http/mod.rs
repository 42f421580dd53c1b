//! HTTP transport layer for the JSON-RPC protocol engine
//!
//! Provides the external API routing, including the `/rpc` listener and connection management.

pub mod handlers;

/// Header carrying the client's connection id across requests.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";
