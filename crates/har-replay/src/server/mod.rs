//! Replay server lifecycle.
//!
//! This module provides:
//! - `ReplayServer`: load → optional alias setup → listen → alias teardown
//! - `ReplayEngine`: the per-request matcher and response writer shared by
//!   every listener
//!
//! ## Module Structure
//!
//! - `types`: lifecycle and aggregate error types
//! - `handler`: HTTP request handling
//! - `network`: listener creation and port checks
//! - `core`: `ReplayServer` itself

mod core;
mod handler;
pub mod network;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::ReplayServer;
pub use handler::{handle_replay_request, live_request, ReplayEngine, UnreadableBody};
pub use types::{LifecycleError, ServerError};
