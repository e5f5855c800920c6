//! TLS material resolution for the HTTPS listener.
//!
//! Material comes either from a key/certificate file pair or from a
//! [`CertificateGenerator`]. It is resolved once per start and only ever
//! held in memory.

mod generator;

pub use generator::SelfSignedGenerator;

use crate::config::TlsConfig;
use rustls::pki_types::CertificateDer;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

/// Error type returned by certificate generators.
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Cannot read TLS file {path}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    #[error("TLS key and certificate must both be supplied or neither")]
    IncompleteMaterial,

    #[error("Failed to generate TLS certificate: {0}")]
    GenerationFailed(String),

    #[error("TLS requested but no key/certificate files were given and generation is disabled")]
    NoMaterial,

    #[error("Invalid TLS material: {0}")]
    InvalidMaterial(String),
}

/// Produces a fresh key/certificate pair on demand.
pub trait CertificateGenerator: Send + Sync {
    fn generate(&self, subject_names: &[String]) -> Result<TlsMaterial, GeneratorError>;
}

/// PEM-encoded private key and certificate chain.
#[derive(Clone)]
pub struct TlsMaterial {
    key_pem: Vec<u8>,
    cert_pem: Vec<u8>,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("key_pem", &"<redacted>")
            .field("cert_pem_len", &self.cert_pem.len())
            .finish()
    }
}

impl TlsMaterial {
    pub fn new(key_pem: Vec<u8>, cert_pem: Vec<u8>) -> Self {
        Self { key_pem, cert_pem }
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    /// Build a rustls acceptor that speaks HTTP/1.1.
    pub fn acceptor(&self) -> Result<TlsAcceptor, TlsError> {
        let certs: Vec<CertificateDer<'static>> =
            rustls_pemfile::certs(&mut self.cert_pem.as_slice())
                .collect::<Result<_, _>>()
                .map_err(|e| TlsError::InvalidMaterial(format!("certificate: {e}")))?;
        if certs.is_empty() {
            return Err(TlsError::InvalidMaterial(
                "no certificates found".to_string(),
            ));
        }

        let key = rustls_pemfile::private_key(&mut self.key_pem.as_slice())
            .map_err(|e| TlsError::InvalidMaterial(format!("private key: {e}")))?
            .ok_or_else(|| TlsError::InvalidMaterial("no private key found".to_string()))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::InvalidMaterial(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TlsError::InvalidMaterial(e.to_string()))?;
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

/// Pick the key/certificate pair for an HTTPS listener.
///
/// A configured file pair always wins over generation.
pub fn resolve(
    config: &TlsConfig,
    generator: &dyn CertificateGenerator,
    subject_names: &[String],
) -> Result<TlsMaterial, TlsError> {
    match (&config.key_file, &config.cert_file) {
        (Some(key_file), Some(cert_file)) => {
            let material = TlsMaterial::new(read_pem(key_file)?, read_pem(cert_file)?);
            info!(
                "Using TLS key {} and certificate {}",
                key_file.display(),
                cert_file.display()
            );
            Ok(material)
        }
        (Some(_), None) | (None, Some(_)) => Err(TlsError::IncompleteMaterial),
        (None, None) if config.generate => {
            let material = generator
                .generate(subject_names)
                .map_err(|e| TlsError::GenerationFailed(e.to_string()))?;
            info!(
                "Generated self-signed certificate for {} name(s)",
                subject_names.len()
            );
            Ok(material)
        }
        (None, None) => Err(TlsError::NoMaterial),
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, TlsError> {
    debug!("Reading TLS file {}", path.display());
    std::fs::read(path).map_err(|e| TlsError::FileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
