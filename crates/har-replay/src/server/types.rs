//! Error types for the server lifecycle.

use crate::alias::AliasError;
use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::tls::TlsError;
use thiserror::Error;

/// Ordering and state violations of the server lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("HAR file has not been loaded")]
    HarNotLoaded,

    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Port {0} is not a valid TCP port")]
    InvalidPort(u16),

    #[error("Cannot bind to port {0} (ports up to 1024) without being root")]
    PrivilegedPortDenied(u16),

    #[error("Host file entries are already applied; clean them before applying again")]
    AliasesAlreadyApplied,

    #[error("Host file entries have not been applied")]
    AliasesNotApplied,

    #[error("Host file entries are configured but have not been applied yet")]
    AliasesPending,

    #[error("Failed to bind port {0}: {1}")]
    Bind(u16, String),
}

/// Any failure a [`ReplayServer`](super::ReplayServer) operation can return.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ServerError {
    /// The lifecycle error, if that is what this is.
    pub fn lifecycle(&self) -> Option<&LifecycleError> {
        match self {
            ServerError::Lifecycle(e) => Some(e),
            _ => None,
        }
    }
}
