//! Shared utilities for the Manabi chat client.
//!
//! Cross-cutting concerns with no chat domain knowledge: clock abstraction,
//! RFC 3339 time helpers, and tracing initialization.

pub mod logger;
pub mod time;
