// ============================================
// File: crates/fleetmock-server/src/main.rs
// ============================================
//! # Fleetmock Entry Point
//!
//! ## Creation Reason
//! Main entry point for the fleetmock binary.
//! Handles CLI parsing, logging setup, and server initialization.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading and CLI overrides
//! - Server execution
//! - Probe session against a running server
//!
//! ## Usage
//! ```bash
//! # Start with defaults (port 8443, node key "mock-node-key")
//! fleetmock start
//!
//! # Serve a config document and two distributed queries
//! fleetmock start --conf osquery.conf \
//!     --dr "select * from osquery_info;" --dr "select * from users;" \
//!     --skip 5 --delay 12
//!
//! # Other commands
//! fleetmock validate                     # Validate config file
//! fleetmock cert                         # Show certificate fingerprint
//! fleetmock probe --url https://localhost:8443 --insecure
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides the configured log level
//! - A missing config file means defaults; a broken one is an error
//! - Exit code 1 on any startup failure
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use fleetmock_common::time::Timestamp;
use fleetmock_core::protocol::LogType;
use fleetmock_server::tls::CertProvider;
use fleetmock_server::{CliOverrides, ProbeClient, ReadPoller, Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// Mock host-management remote API server
///
/// Quick Start:
///   1. Run: fleetmock start --insecure
///   2. Point an agent at it with node key "mock-node-key"
#[derive(Parser, Debug)]
#[command(name = "fleetmock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "fleetmock.toml")]
        config: PathBuf,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Agent configuration document served on /config
        #[arg(long)]
        conf: Option<PathBuf>,

        /// Distributed query (repeatable)
        #[arg(long = "dr")]
        dr: Vec<String>,

        /// Empty polls before a distributed query is handed out
        #[arg(long, allow_negative_numbers = true)]
        skip: Option<i64>,

        /// Seconds an empty /read poll is held
        #[arg(long)]
        delay: Option<u64>,

        /// Node key handed out on enrollment
        #[arg(long)]
        node_key: Option<String>,

        /// Echo status logs
        #[arg(short, long)]
        verbose: bool,

        /// Serve plain HTTP instead of HTTPS
        #[arg(long)]
        insecure: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "fleetmock.toml")]
        config: PathBuf,
    },

    /// Generate (if needed) and show the TLS certificate
    Cert {
        /// Path to configuration file
        #[arg(short, long, default_value = "fleetmock.toml")]
        config: PathBuf,
    },

    /// Run one agent session against a running server
    Probe {
        /// Server base URL
        #[arg(short, long, default_value = "https://localhost:8443")]
        url: String,

        /// Accept the server's self-signed certificate
        #[arg(long)]
        insecure: bool,

        /// Stop after this many distributed queries (0 = until Ctrl+C)
        #[arg(short, long, default_value_t = 1)]
        queries: usize,

        /// Milliseconds between /read polls
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Host identifier sent on enrollment
        #[arg(long, default_value = "fleetmock-probe")]
        host: String,

        /// Use this node key instead of the enrolled one
        #[arg(long)]
        node_key: Option<String>,
    },
}

type LogHandle = reload::Handle<EnvFilter, Registry>;

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_handle = init_logging("info");

    // Execute command
    let result = match cli.command {
        Commands::Start {
            config,
            port,
            conf,
            dr,
            skip,
            delay,
            node_key,
            verbose,
            insecure,
        } => {
            let overrides = CliOverrides {
                port,
                conf,
                queries: dr,
                skip,
                delay_secs: delay,
                node_key,
                verbose,
                insecure,
            };
            cmd_start(config, overrides, log_handle.as_ref()).await
        }
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Cert { config } => cmd_cert(config).await,
        Commands::Probe {
            url,
            insecure,
            queries,
            interval_ms,
            host,
            node_key,
        } => {
            cmd_probe(
                url,
                insecure,
                queries,
                Duration::from_millis(interval_ms),
                host,
                node_key,
            )
            .await
        }
    };

    // Handle errors
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(
    config_path: PathBuf,
    overrides: CliOverrides,
    log_handle: Option<&LogHandle>,
) -> anyhow::Result<()> {
    let mut config = load_or_default_config(&config_path).await?;
    overrides.apply(&mut config);
    config.validate()?;

    // Apply configured log level
    if let Some(handle) = log_handle {
        set_log_level(handle, &config.logging.level);
    }

    info!("════════════════════════════════════════");
    info!("Listen:     {}", config.listen_addr());
    info!("TLS:        {}", if config.tls.enabled { "on" } else { "off" });
    info!("Node key:   {}", config.node.node_key);
    info!(
        "Queries:    {} (skip {}, delay {}s)",
        config.distributed.queries.len(),
        config.distributed.skip_threshold(),
        config.distributed.delay_secs
    );
    info!("Sink:       {:?}", config.sink.kind);
    info!("════════════════════════════════════════");

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;
    let agent_document = config.agent.load_document().await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:     {}", config.listen_addr());
    println!("   TLS:        {}", config.tls.enabled);
    println!();
    println!("Agent:");
    match &config.agent.config_path {
        Some(path) => println!("   Config:     {}", path.display()),
        None => println!("   Config:     (empty document)"),
    }
    println!(
        "   Keys:       {}",
        agent_document.as_object().map_or(0, serde_json::Map::len)
    );
    println!();
    println!("Distributed:");
    println!("   Queries:    {}", config.distributed.queries.len());
    println!("   Skip:       {}", config.distributed.skip_threshold());
    println!("   Delay:      {}s", config.distributed.delay_secs);
    println!();
    println!("Sink:");
    println!("   Kind:       {:?}", config.sink.kind);
    println!("   Path:       {}", config.sink.path.display());
    println!();

    Ok(())
}

/// Generates or loads the certificate and prints its fingerprint.
async fn cmd_cert(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;
    let provider = CertProvider::from_config(&config.tls);
    let pem = provider.load_or_generate().await?;

    println!(
        "{} TLS certificate",
        if pem.generated { "🆕 Generated" } else { "✅ Existing" }
    );
    println!();
    println!("   Certificate:  {}", provider.cert_path().display());
    println!("   Key:          {}", provider.key_path().display());
    println!("   SHA-256:      {}", pem.fingerprint);
    println!();

    Ok(())
}

/// Drives one agent session against a running server.
async fn cmd_probe(
    url: String,
    insecure: bool,
    queries: usize,
    interval: Duration,
    host: String,
    node_key: Option<String>,
) -> anyhow::Result<()> {
    let client = Arc::new(ProbeClient::new(url, insecure, Duration::from_secs(60))?);

    client.enroll(&host).await?;
    if let Some(key) = node_key {
        warn!("Overriding enrolled node key");
        client.set_node_key(key);
    }

    let document = client.config().await?;
    println!("Config: {}", serde_json::to_string_pretty(&document)?);

    client
        .submit_log(
            LogType::Result,
            json!([{
                "name": "fleetmock_probe",
                "columns": {"host": host, "unix_time": Timestamp::now().as_secs()}
            }]),
        )
        .await?;
    info!("Result log submitted");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let received = ReadPoller::new(Arc::clone(&client), interval, queries)
        .run(shutdown_rx)
        .await?;
    for (key, query) in &received {
        println!("{key}: {query}");
    }

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
///
/// Returns a handle for changing the level once the config is loaded.
fn init_logging(level: &str) -> Option<LogHandle> {
    let (filter, handle) = reload::Layer::new(build_filter(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .ok()
        .map(|()| handle)
}

/// Switches to `level` unless `RUST_LOG` is set.
fn set_log_level(handle: &LogHandle, level: &str) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    if let Err(e) = handle.reload(EnvFilter::new(level)) {
        warn!("Failed to apply log level '{}': {}", level, e);
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Loads config, or returns defaults if the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        info!("Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}
