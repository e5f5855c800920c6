//! har-replay CLI
//!
//! Serves a HAR file until interrupted.
//!
//! Usage:
//!   har-replay [OPTIONS] [ARCHIVE]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use har_replay::{ReplayConfig, ReplayServer};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Replay a HAR file as a live HTTP/HTTPS server
#[derive(Parser, Debug)]
#[command(name = "har-replay")]
#[command(author, version, about = "Serve recorded HAR responses over HTTP and HTTPS")]
struct Args {
    /// HAR file to serve (required unless the config file names one)
    archive: Option<PathBuf>,

    /// YAML or JSON config file; flags override its values
    #[arg(long, env = "HAR_REPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Plain HTTP port [default: 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind [default: 0.0.0.0]
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Address archived hostnames are pointed at [default: 127.0.0.1]
    #[arg(long)]
    host_file_ip: Option<IpAddr>,

    /// Add hosts-file entries for every archived hostname
    #[arg(short = 'H', long)]
    set_host_file_entries: bool,

    /// Remove the added hosts-file entries on exit
    #[arg(short, long)]
    remove_host_file_entries: bool,

    /// Hosts file to edit instead of the system one
    #[arg(long)]
    hosts_file: Option<PathBuf>,

    /// Serve HTTPS as well
    #[arg(short = 's', long)]
    use_ssl: bool,

    /// HTTPS port [default: 4433]
    #[arg(long)]
    ssl_port: Option<u16>,

    /// Do not generate a self-signed certificate when no key/cert is given
    #[arg(long)]
    no_generate_key: bool,

    /// TLS private key (PEM)
    #[arg(short = 'k', long)]
    ssl_key_file: Option<PathBuf>,

    /// TLS certificate (PEM)
    #[arg(short = 'c', long)]
    ssl_cert_file: Option<PathBuf>,

    /// With --use-ssl, do not also serve plain HTTP
    #[arg(long)]
    no_plaintext_mirror: bool,

    /// Match requests without comparing the Host header
    #[arg(short = 'd', long)]
    dont_match_on_host: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "har_replay=info".into()),
        )
        .with(text)
        .with(json)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let revert_on_exit = config.aliases.revert_on_exit;
    let mut server = ReplayServer::new(config);

    if let Err(e) = server.run().await {
        if revert_on_exit && server.aliases_applied() {
            server
                .clean_aliases()
                .context("Failed to remove host file entries")?;
        }
        return Err(e.into());
    }

    info!("Replaying HAR file; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    server.stop().await;
    if revert_on_exit && server.aliases_applied() {
        server
            .clean_aliases()
            .context("Failed to remove host file entries")?;
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<ReplayConfig> {
    let mut config = match &args.config {
        Some(path) => ReplayConfig::from_file(path)?,
        None => ReplayConfig::default(),
    };

    if let Some(archive) = &args.archive {
        config.archive_path = Some(archive.clone());
    }
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(bind) = args.bind {
        config.listen.bind_address = bind;
    }

    let tls = &mut config.listen.tls;
    if args.use_ssl {
        tls.enabled = true;
    }
    if let Some(port) = args.ssl_port {
        tls.port = port;
    }
    if args.no_generate_key {
        tls.generate = false;
    }
    if let Some(key) = &args.ssl_key_file {
        tls.key_file = Some(key.clone());
    }
    if let Some(cert) = &args.ssl_cert_file {
        tls.cert_file = Some(cert.clone());
    }
    if args.no_plaintext_mirror {
        tls.plaintext_mirror = false;
    }

    let aliases = &mut config.aliases;
    if args.set_host_file_entries {
        aliases.apply = true;
    }
    if args.remove_host_file_entries {
        aliases.revert_on_exit = true;
    }
    if let Some(ip) = args.host_file_ip {
        aliases.target_ip = ip;
    }
    if let Some(path) = &args.hosts_file {
        aliases.hosts_file = Some(path.clone());
    }

    if args.dont_match_on_host {
        config.matching.ignore_host_header = true;
    }

    config.validate()?;
    Ok(config)
}
