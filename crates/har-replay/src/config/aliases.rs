//! Hosts-file aliasing and matching options.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AliasConfig {
    /// Point every archived hostname at `target_ip` before listening.
    #[serde(default)]
    pub apply: bool,
    #[serde(default = "default_target_ip")]
    pub target_ip: IpAddr,
    /// Remove the entries again on shutdown.
    #[serde(default)]
    pub revert_on_exit: bool,
    /// Defaults to the platform hosts file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file: Option<PathBuf>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            apply: false,
            target_ip: default_target_ip(),
            revert_on_exit: false,
            hosts_file: None,
        }
    }
}

fn default_target_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Request matching switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchOptions {
    /// Match without comparing the `Host` header.
    #[serde(default)]
    pub ignore_host_header: bool,
}
