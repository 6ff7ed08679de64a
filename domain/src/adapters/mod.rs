//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests, the demo CLI, and the server's
//! `memory` storage mode. Persistent adapters live in separate crates.

pub mod memory_repo;
