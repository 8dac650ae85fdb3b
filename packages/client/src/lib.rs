//! Real-time chat synchronization client for the Manabi learning platform.
//!
//! Booking and consultation chat rooms share one process-wide WebSocket
//! connection per chat domain. This crate owns the state-consistency core:
//! the reconnecting transport, the event subscription registry, the
//! message reconciliation timeline, and the per-room attach/detach
//! lifecycle. Rendering and the REST/WebSocket far side live elsewhere.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
