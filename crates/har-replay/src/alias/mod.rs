//! Hostname aliasing through a local name-resolution store.
//!
//! Entries are derived from the archive on every call and applied one at a
//! time. Nothing is rolled back when a later entry fails.

mod hosts;

pub use hosts::HostsFile;

use crate::archive::Archive;
use std::collections::HashSet;
use std::io;
use std::net::IpAddr;
use thiserror::Error;
use tracing::info;

/// Process-wide name-resolution store the aliases are written to.
pub trait AliasStore: Send + Sync {
    /// Human-readable location for error messages.
    fn location(&self) -> String;

    /// Fails when the store cannot be modified.
    fn check_writable(&self) -> io::Result<()>;

    /// Map `hostname` to `ip`. Already-present mappings succeed.
    fn set(&self, ip: IpAddr, hostname: &str) -> io::Result<()>;

    /// Remove the mapping. Missing mappings succeed.
    fn remove(&self, ip: IpAddr, hostname: &str) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("No write access to {location}: {reason}")]
    AccessDenied { location: String, reason: String },

    #[error("Alias update failed for {hostname} after {completed} of {total} entries: {reason}")]
    PartialApply {
        completed: usize,
        total: usize,
        hostname: String,
        reason: String,
    },
}

/// A hostname to point at `ip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub hostname: String,
    pub ip: IpAddr,
}

/// Distinct non-IP hostnames in archive order, each paired with `target_ip`.
pub fn derive(archive: &Archive, target_ip: IpAddr) -> Vec<AliasEntry> {
    let mut seen = HashSet::new();
    archive
        .iter()
        .map(|exchange| exchange.parsed_url().hostname.as_str())
        .filter(|hostname| !hostname.is_empty() && hostname.parse::<IpAddr>().is_err())
        .filter(|hostname| seen.insert(hostname.to_string()))
        .map(|hostname| AliasEntry {
            hostname: hostname.to_string(),
            ip: target_ip,
        })
        .collect()
}

/// Write every entry to `store`, in order.
pub fn apply(store: &dyn AliasStore, entries: &[AliasEntry]) -> Result<(), AliasError> {
    if entries.is_empty() {
        return Ok(());
    }
    ensure_writable(store)?;

    for (completed, entry) in entries.iter().enumerate() {
        store
            .set(entry.ip, &entry.hostname)
            .map_err(|e| partial(completed, entries, entry, e))?;
        info!("Added alias {} -> {}", entry.hostname, entry.ip);
    }
    Ok(())
}

/// Remove every entry from `store`, in order.
pub fn revert(store: &dyn AliasStore, entries: &[AliasEntry]) -> Result<(), AliasError> {
    if entries.is_empty() {
        return Ok(());
    }
    ensure_writable(store)?;

    for (completed, entry) in entries.iter().enumerate() {
        store
            .remove(entry.ip, &entry.hostname)
            .map_err(|e| partial(completed, entries, entry, e))?;
        info!("Removed alias {} -> {}", entry.hostname, entry.ip);
    }
    Ok(())
}

fn ensure_writable(store: &dyn AliasStore) -> Result<(), AliasError> {
    store
        .check_writable()
        .map_err(|e| AliasError::AccessDenied {
            location: store.location(),
            reason: e.to_string(),
        })
}

fn partial(completed: usize, entries: &[AliasEntry], entry: &AliasEntry, e: io::Error) -> AliasError {
    AliasError::PartialApply {
        completed,
        total: entries.len(),
        hostname: entry.hostname.clone(),
        reason: e.to_string(),
    }
}
