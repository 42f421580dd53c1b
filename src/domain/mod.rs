//! Built-in commands exposed over the protocol engine
//!
//! Commands are registered by name in a `CommandRegistry`.

pub mod echo;
