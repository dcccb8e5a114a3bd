//! Core services that make up the key operation gateway.
//!
//! # Services overview
//!
//! - [`memory_keystore`] – a software key-custody backend holding keys in memory.
//! - [`worker_pool`] – runs backend primitives with a bounded wait.

pub mod memory_keystore;
pub(crate) mod worker_pool;
