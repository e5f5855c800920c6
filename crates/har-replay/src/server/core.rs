//! The replay server and its lifecycle.

use super::handler::{handle_replay_request, ReplayEngine};
use super::network::{create_listener, is_privileged_port, running_as_root};
use super::types::{LifecycleError, ServerError};
use crate::alias::{self, AliasStore, HostsFile};
use crate::archive::Archive;
use crate::config::{ConfigError, ReplayConfig};
use crate::logging::{ReplayLog, TracingLog};
use crate::tls::{self, CertificateGenerator, SelfSignedGenerator};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error};

/// A bound listener and the task accepting on it.
struct RunningListener {
    addr: SocketAddr,
    scheme: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Serves one archive over HTTP and optionally HTTPS.
///
/// Operations take `&mut self` and must be called in lifecycle order:
/// [`load_archive`](Self::load_archive), then optionally
/// [`apply_aliases`](Self::apply_aliases), then [`start`](Self::start).
pub struct ReplayServer {
    config: ReplayConfig,
    log: Arc<dyn ReplayLog>,
    alias_store: Arc<dyn AliasStore>,
    generator: Arc<dyn CertificateGenerator>,
    archive: Option<Arc<Archive>>,
    aliases_applied: bool,
    listeners: Vec<RunningListener>,
}

impl ReplayServer {
    /// Server with the default collaborators: `tracing` output, the
    /// configured (or system) hosts file, and self-signed certificates.
    pub fn new(config: ReplayConfig) -> Self {
        let hosts = match &config.aliases.hosts_file {
            Some(path) => HostsFile::new(path),
            None => HostsFile::system(),
        };
        Self {
            config,
            log: Arc::new(TracingLog),
            alias_store: Arc::new(hosts),
            generator: Arc::new(SelfSignedGenerator::default()),
            archive: None,
            aliases_applied: false,
            listeners: Vec::new(),
        }
    }

    pub fn with_log(mut self, log: Arc<dyn ReplayLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_alias_store(mut self, store: Arc<dyn AliasStore>) -> Self {
        self.alias_store = store;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn CertificateGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// The loaded model, if any.
    pub fn archive(&self) -> Option<&Arc<Archive>> {
        self.archive.as_ref()
    }

    pub fn aliases_applied(&self) -> bool {
        self.aliases_applied
    }

    /// Parse and validate the archive, replacing any previously loaded one.
    ///
    /// `path` overrides the configured archive path. Running listeners keep
    /// the model they were started with.
    pub fn load_archive(&mut self, path: Option<&Path>) -> Result<(), ServerError> {
        if let Some(path) = path {
            self.config.archive_path = Some(path.to_path_buf());
        }
        let path = self
            .config
            .archive_path
            .as_deref()
            .ok_or(ConfigError::MissingArchivePath)?;

        let archive = Archive::load_file(path)?;
        self.log.info(&format!(
            "Loaded {} entries from {}",
            archive.len(),
            archive.source_name()
        ));
        self.archive = Some(Arc::new(archive));
        Ok(())
    }

    /// Point every archived hostname at the configured target address.
    pub fn apply_aliases(&mut self) -> Result<(), ServerError> {
        if !self.config.aliases.apply {
            self.log
                .info("Skipping host file entries (not requested)");
            return Ok(());
        }
        let archive = self.archive.as_ref().ok_or(LifecycleError::HarNotLoaded)?;
        if self.aliases_applied {
            return Err(LifecycleError::AliasesAlreadyApplied.into());
        }

        let entries = alias::derive(archive, self.config.aliases.target_ip);
        self.log.info(&format!(
            "Adding {} host file entries to {}",
            entries.len(),
            self.alias_store.location()
        ));
        alias::apply(self.alias_store.as_ref(), &entries)?;
        self.aliases_applied = true;
        Ok(())
    }

    /// Remove the entries added by [`apply_aliases`](Self::apply_aliases).
    ///
    /// The entry set is derived again from the loaded model.
    pub fn clean_aliases(&mut self) -> Result<(), ServerError> {
        if !self.aliases_applied {
            return Err(LifecycleError::AliasesNotApplied.into());
        }
        let archive = self.archive.as_ref().ok_or(LifecycleError::HarNotLoaded)?;

        let entries = alias::derive(archive, self.config.aliases.target_ip);
        self.log.info(&format!(
            "Removing {} host file entries from {}",
            entries.len(),
            self.alias_store.location()
        ));
        alias::revert(self.alias_store.as_ref(), &entries)?;
        self.aliases_applied = false;
        Ok(())
    }

    /// Bind the configured listener(s) and start serving the loaded model.
    ///
    /// When host file entries are configured they must have been applied
    /// first.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        let archive = self
            .archive
            .clone()
            .ok_or(LifecycleError::HarNotLoaded)?;
        if self.is_running() {
            return Err(LifecycleError::AlreadyRunning.into());
        }
        if self.config.aliases.apply && !self.aliases_applied {
            return Err(LifecycleError::AliasesPending.into());
        }

        let listen = self.config.listen.clone();
        let ports = listen.requested_ports();
        if let Some(port) = ports.iter().copied().find(|p| *p == 0) {
            return Err(LifecycleError::InvalidPort(port).into());
        }
        if !running_as_root() {
            if let Some(port) = ports.iter().copied().find(|p| is_privileged_port(*p)) {
                return Err(LifecycleError::PrivilegedPortDenied(port).into());
            }
        }

        let acceptor = if listen.tls.enabled {
            let names: Vec<String> = alias::derive(&archive, self.config.aliases.target_ip)
                .into_iter()
                .map(|entry| entry.hostname)
                .collect();
            let material = tls::resolve(&listen.tls, self.generator.as_ref(), &names)?;
            Some(material.acceptor()?)
        } else {
            None
        };

        let engine = Arc::new(ReplayEngine::new(
            archive,
            self.config.matching.clone(),
            Arc::clone(&self.log),
        ));

        if let Some(acceptor) = acceptor {
            self.bind(listen.tls.port, Arc::clone(&engine), Some(acceptor))?;
            if listen.tls.plaintext_mirror {
                if let Err(e) = self.bind(listen.port, engine, None) {
                    self.stop().await;
                    return Err(e);
                }
            }
        } else {
            self.bind(listen.port, engine, None)?;
        }

        Ok(())
    }

    /// `load_archive`, `apply_aliases` (when configured), then `start`.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.load_archive(None)?;
        self.apply_aliases()?;
        self.start().await
    }

    pub fn is_running(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Addresses of the running listeners, HTTPS first.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(|l| l.addr).collect()
    }

    /// Close every listener and wait for its accept loop to exit.
    pub async fn stop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.shutdown_tx.send(());
            if let Err(e) = listener.handle.await {
                error!("Listener task on {} failed: {}", listener.addr, e);
            }
            self.log.info(&format!(
                "Stopped listening on {}://{}",
                listener.scheme, listener.addr
            ));
        }
    }

    fn bind(
        &mut self,
        port: u16,
        engine: Arc<ReplayEngine>,
        acceptor: Option<TlsAcceptor>,
    ) -> Result<(), ServerError> {
        let addr = SocketAddr::new(self.config.listen.bind_address, port);
        let listener =
            create_listener(addr).map_err(|e| LifecycleError::Bind(port, e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| LifecycleError::Bind(port, e.to_string()))?;

        let scheme = if acceptor.is_some() { "https" } else { "http" };
        // Subscribe before spawning so a stop issued right away is not lost.
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(accept_loop(
            listener,
            engine,
            acceptor,
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        self.log
            .info(&format!("Listening on {scheme}://{addr}"));
        self.listeners.push(RunningListener {
            addr,
            scheme,
            shutdown_tx,
            handle,
        });
        Ok(())
    }
}

impl Drop for ReplayServer {
    fn drop(&mut self) {
        for listener in &self.listeners {
            let _ = listener.shutdown_tx.send(());
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    engine: Arc<ReplayEngine>,
    acceptor: Option<TlsAcceptor>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, client_addr)) => {
                        let engine = Arc::clone(&engine);
                        let acceptor = acceptor.clone();
                        let conn_shutdown = shutdown_tx.subscribe();
                        tokio::spawn(async move {
                            match acceptor {
                                Some(acceptor) => match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        serve_connection(tls_stream, engine, client_addr, conn_shutdown).await
                                    }
                                    Err(e) => debug!("TLS handshake with {} failed: {}", client_addr, e),
                                },
                                None => serve_connection(stream, engine, client_addr, conn_shutdown).await,
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Accept loop shutting down");
                break;
            }
        }
    }
}

async fn serve_connection<S>(
    stream: S,
    engine: Arc<ReplayEngine>,
    client_addr: SocketAddr,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let engine = Arc::clone(&engine);
        async move { handle_replay_request(req, engine, client_addr).await }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                debug!("Connection error from {}: {}", client_addr, e);
            }
        }
        _ = shutdown_rx.recv() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.as_mut().await {
                debug!("Connection error from {} during shutdown: {}", client_addr, e);
            }
        }
    }
}
