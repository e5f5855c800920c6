//! Tests for the server lifecycle.
//!
//! Covers ordering rules between load, alias and listen steps, port
//! validation, dual-protocol start-up and restart behaviour.

use super::*;
use crate::alias::tests::RecordingStore;
use crate::alias::AliasError;
use crate::config::{ConfigError, ReplayConfig};
use crate::logging::MemoryLog;
use crate::tls::TlsError;
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn next_port() -> u16 {
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(38100);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn write_archive(dir: &Path, name: &str, text: &str) -> PathBuf {
    let doc = json!({"log": {"version": "1.2", "creator": {"name": "test", "version": "1"}, "entries": [
        {
            "request": {"method": "GET", "url": "http://a.test/page"},
            "response": {"status": 200, "headers": [], "content": {"size": text.len(), "text": text}}
        },
        {
            "request": {"method": "GET", "url": "https://b.test:8443/other"},
            "response": {"status": 204, "headers": [], "content": {"size": 0}}
        }
    ]}});
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    path
}

fn config(archive: &Path) -> ReplayConfig {
    let mut config = ReplayConfig::for_archive(archive);
    config.listen.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listen.port = next_port();
    config.listen.tls.port = next_port();
    config
}

fn server(config: ReplayConfig) -> (ReplayServer, Arc<MemoryLog>, Arc<RecordingStore>) {
    let log = Arc::new(MemoryLog::new());
    let store = Arc::new(RecordingStore::default());
    let server = ReplayServer::new(config)
        .with_log(log.clone())
        .with_alias_store(store.clone());
    (server, log, store)
}

async fn raw_get(addr: SocketAddr, path: &str, host: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

fn port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

#[tokio::test]
async fn test_start_before_load_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (mut server, _, _) = server(config(&write_archive(dir.path(), "a.har", "hi")));

    let err = server.start().await.unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::HarNotLoaded));
    assert!(!server.is_running());
}

#[test]
fn test_load_without_path_is_config_error() {
    let (mut server, _, _) = server(ReplayConfig::default());
    let err = server.load_archive(None).unwrap_err();
    assert!(matches!(
        err,
        ServerError::Config(ConfigError::MissingArchivePath)
    ));
}

#[test]
fn test_load_rejects_invalid_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    std::fs::write(&path, r#"{"name": "not-a-har"}"#).unwrap();

    let (mut server, _, _) = server(ReplayConfig::default());
    let err = server.load_archive(Some(&path)).unwrap_err();
    assert!(matches!(err, ServerError::Archive(_)));
    assert!(server.archive().is_none());
}

#[test]
fn test_load_path_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_archive(dir.path(), "a.har", "hi");
    let (mut server, log, _) = server(ReplayConfig::default());

    server.load_archive(Some(&path)).unwrap();
    assert_eq!(server.config().archive_path.as_deref(), Some(path.as_path()));
    assert_eq!(server.archive().unwrap().len(), 2);
    assert!(log.contains("Loaded 2 entries"));
}

#[tokio::test]
async fn test_serves_loaded_archive() {
    let dir = tempfile::tempdir().unwrap();
    let (mut server, log, _) = server(config(&write_archive(dir.path(), "a.har", "hello")));
    server.load_archive(None).unwrap();
    server.start().await.unwrap();

    let addr = server.local_addrs()[0];
    let response = raw_get(addr, "/page", "a.test").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("hello"), "{response}");

    let response = raw_get(addr, "/missing", "a.test").await;
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    assert!(response.contains("Cannot find HAR file entry for a GET to /missing"));

    server.stop().await;
    assert!(log.contains("GET (200) a.test /page"));
}

#[tokio::test]
async fn test_double_start_is_rejected_and_restart_works() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&write_archive(dir.path(), "a.har", "hi"));
    let port = config.listen.port;
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    server.start().await.unwrap();
    assert!(server.is_running());
    let err = server.start().await.unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::AlreadyRunning));
    assert!(server.is_running());

    server.stop().await;
    assert!(!server.is_running());
    assert!(server.local_addrs().is_empty());
    assert!(port_is_free(port));

    server.start().await.unwrap();
    assert!(server.is_running());
    server.stop().await;
}

#[tokio::test]
async fn test_stop_when_not_running_is_a_no_op() {
    let (mut server, log, _) = server(ReplayConfig::default());
    server.stop().await;
    assert!(!server.is_running());
    assert!(log.lines().is_empty());
}

#[tokio::test]
async fn test_port_zero_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.port = 0;
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    let err = server.start().await.unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::InvalidPort(0)));
}

#[tokio::test]
async fn test_privileged_port_requires_root() {
    if network::running_as_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.port = 80;
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    let err = server.start().await.unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::PrivilegedPortDenied(80)));
    assert!(!server.is_running());
}

#[tokio::test]
async fn test_tls_without_material_binds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.tls.enabled = true;
    config.listen.tls.generate = false;
    let (http_port, https_port) = (config.listen.port, config.listen.tls.port);
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::Tls(TlsError::NoMaterial)));
    assert!(!server.is_running());
    assert!(port_is_free(http_port));
    assert!(port_is_free(https_port));
}

#[tokio::test]
async fn test_dual_protocol_binds_both_ports() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.tls.enabled = true;
    let (http_port, https_port) = (config.listen.port, config.listen.tls.port);
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    server.start().await.unwrap();
    let ports: Vec<u16> = server.local_addrs().iter().map(|a| a.port()).collect();
    assert_eq!(ports, vec![https_port, http_port]);

    let response = raw_get(server.local_addrs()[1], "/page", "a.test").await;
    assert!(response.ends_with("hi"), "{response}");
    server.stop().await;
}

#[tokio::test]
async fn test_tls_only_when_mirror_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.tls.enabled = true;
    config.listen.tls.plaintext_mirror = false;
    let https_port = config.listen.tls.port;
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    server.start().await.unwrap();
    let ports: Vec<u16> = server.local_addrs().iter().map(|a| a.port()).collect();
    assert_eq!(ports, vec![https_port]);
    server.stop().await;
}

#[tokio::test]
async fn test_second_bind_failure_stops_first_listener() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.tls.enabled = true;
    let (http_port, https_port) = (config.listen.port, config.listen.tls.port);
    let _blocker = std::net::TcpListener::bind(("127.0.0.1", http_port)).unwrap();
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    let err = server.start().await.unwrap_err();
    assert!(matches!(
        err.lifecycle(),
        Some(LifecycleError::Bind(port, _)) if *port == http_port
    ));
    assert!(!server.is_running());
    assert!(port_is_free(https_port));
}

#[tokio::test]
async fn test_reload_does_not_affect_running_listener() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_archive(dir.path(), "first.har", "old");
    let second = write_archive(dir.path(), "second.har", "new");
    let (mut server, _, _) = server(config(&first));
    server.load_archive(None).unwrap();
    server.start().await.unwrap();

    server.load_archive(Some(&second)).unwrap();
    let addr = server.local_addrs()[0];
    assert!(raw_get(addr, "/page", "a.test").await.ends_with("old"));

    server.stop().await;
    server.start().await.unwrap();
    let addr = server.local_addrs()[0];
    assert!(raw_get(addr, "/page", "a.test").await.ends_with("new"));
    server.stop().await;
}

#[test]
fn test_apply_aliases_skipped_unless_requested() {
    let dir = tempfile::tempdir().unwrap();
    let (mut server, log, store) = server(config(&write_archive(dir.path(), "a.har", "hi")));
    server.load_archive(None).unwrap();

    server.apply_aliases().unwrap();
    assert!(!server.aliases_applied());
    assert!(store.calls.lock().is_empty());
    assert!(log.contains("Skipping host file entries"));
}

#[test]
fn test_alias_ordering_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.aliases.apply = true;
    let (mut server, _, store) = server(config);

    let err = server.apply_aliases().unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::HarNotLoaded));

    let err = server.clean_aliases().unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::AliasesNotApplied));

    server.load_archive(None).unwrap();
    server.apply_aliases().unwrap();
    assert!(server.aliases_applied());

    let err = server.apply_aliases().unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::AliasesAlreadyApplied));

    server.clean_aliases().unwrap();
    assert!(!server.aliases_applied());
    assert_eq!(
        *store.calls.lock(),
        vec![
            "set 127.0.0.1 a.test",
            "set 127.0.0.1 b.test",
            "remove 127.0.0.1 a.test",
            "remove 127.0.0.1 b.test",
        ]
    );

    let err = server.clean_aliases().unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::AliasesNotApplied));
}

#[test]
fn test_alias_failure_leaves_state_unapplied() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.aliases.apply = true;
    let store = Arc::new(RecordingStore {
        deny: true,
        ..Default::default()
    });
    let mut server = ReplayServer::new(config)
        .with_log(Arc::new(MemoryLog::new()))
        .with_alias_store(store);
    server.load_archive(None).unwrap();

    let err = server.apply_aliases().unwrap_err();
    assert!(matches!(err, ServerError::Alias(AliasError::AccessDenied { .. })));
    assert!(!server.aliases_applied());
}

#[tokio::test]
async fn test_run_loads_applies_and_starts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.aliases.apply = true;
    config.aliases.target_ip = "10.0.0.9".parse().unwrap();
    let (mut server, _, store) = server(config);

    server.run().await.unwrap();
    assert!(server.is_running());
    assert!(server.aliases_applied());
    assert_eq!(store.calls.lock().len(), 2);
    assert_eq!(store.calls.lock()[0], "set 10.0.0.9 a.test");

    server.stop().await;
    server.clean_aliases().unwrap();
}

#[tokio::test]
async fn test_stop_right_after_start_returns() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.listen.tls.enabled = true;
    let (http_port, https_port) = (config.listen.port, config.listen.tls.port);
    let (mut server, _, _) = server(config);
    server.load_archive(None).unwrap();

    for _ in 0..3 {
        server.start().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), server.stop())
            .await
            .expect("stop should not hang");
        assert!(!server.is_running());
    }
    assert!(port_is_free(http_port));
    assert!(port_is_free(https_port));
}

#[tokio::test]
async fn test_start_waits_for_requested_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&write_archive(dir.path(), "a.har", "hi"));
    config.aliases.apply = true;
    let port = config.listen.port;
    let (mut server, _, store) = server(config);
    server.load_archive(None).unwrap();

    let err = server.start().await.unwrap_err();
    assert_eq!(err.lifecycle(), Some(&LifecycleError::AliasesPending));
    assert!(!server.is_running());
    assert!(port_is_free(port));
    assert!(store.calls.lock().is_empty());

    server.apply_aliases().unwrap();
    server.start().await.unwrap();
    assert!(server.is_running());
    server.stop().await;
    server.clean_aliases().unwrap();
}
