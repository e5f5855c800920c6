//! Replay a captured HTTP Archive (HAR) as a live HTTP/HTTPS server.
//!
//! Incoming requests are matched against the archive by method, path and
//! `Host`, and answered with the recorded status, headers and body.
//!
//! ```no_run
//! use har_replay::{ReplayConfig, ReplayServer};
//!
//! # async fn demo() -> Result<(), har_replay::ServerError> {
//! let mut server = ReplayServer::new(ReplayConfig::for_archive("capture.har"));
//! server.run().await?;
//! // ... exercise the client under test ...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

// ===== Replay engine =====
pub mod archive;
pub mod matcher;
pub mod response;

// ===== Collaborators =====
pub mod alias;
pub mod tls;

// ===== Server and ambient =====
pub mod config;
pub mod logging;
pub mod server;

pub use archive::{Archive, ArchiveError, RecordedExchange};
pub use config::{ConfigError, ReplayConfig};
pub use matcher::{find_match, LiveRequest, MatchOptions};
pub use server::{LifecycleError, ReplayServer, ServerError};
