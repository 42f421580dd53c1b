//! Collaborators the protocol engine calls into
//!
//! Connections and sessions, the per-call scope, call lifecycle listeners and
//! the command executor.

pub mod command;
pub mod connection;
pub mod listeners;
pub mod scope;
pub mod session;
