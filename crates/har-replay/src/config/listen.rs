//! Listener and TLS configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// TLS configuration for the HTTPS listener.
///
/// `key_file` and `cert_file` must be given together. When neither is set
/// and `generate` is on, a short-lived self-signed pair is created at start.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_tls_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub generate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,
    /// Also serve plain HTTP on `listen.port` while TLS is on.
    #[serde(default = "default_true")]
    pub plaintext_mirror: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_tls_port(),
            generate: true,
            key_file: None,
            cert_file: None,
            plaintext_mirror: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: TlsConfig,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            tls: TlsConfig::default(),
        }
    }
}

impl ListenConfig {
    /// Ports that `start` will bind, HTTPS first.
    pub fn requested_ports(&self) -> Vec<u16> {
        if !self.tls.enabled {
            return vec![self.port];
        }
        let mut ports = vec![self.tls.port];
        if self.tls.plaintext_mirror {
            ports.push(self.port);
        }
        ports
    }
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_tls_port() -> u16 {
    4433
}

fn default_true() -> bool {
    true
}
