//! courier - HTTP call relay with a recorded history
//!
//! 起動の流れ：
//! 1) CLI / 環境変数から設定を読む
//! 2) AppBuilder で Relay を組み立てる（DB に繋がらなければここで終了）
//! 3) Ctrl-C までリクエストを捌き、最後にストアを閉じる

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use courier_core::app::{AppBuilder, serve};
use courier_core::config::{BackendConfig, ForwarderConfig, SqliteConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Sqlite,
}

#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(version, about = "Forward HTTP calls and keep a history of them", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "COURIER_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// History backend
    #[arg(long, env = "COURIER_BACKEND", value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// sqlx SQLite URL, used with `--backend sqlite`
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://courier.db")]
    database_url: String,

    /// Outbound call timeout in seconds (no timeout when unset)
    #[arg(long, env = "COURIER_FORWARD_TIMEOUT_SECS")]
    forward_timeout_secs: Option<u64>,

    /// Log filter
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

impl Cli {
    fn backend_config(&self) -> BackendConfig {
        match self.backend {
            Backend::Memory => BackendConfig::Memory,
            Backend::Sqlite => BackendConfig::Sqlite(SqliteConfig::new(self.database_url.clone())),
        }
    }

    fn forwarder_config(&self) -> ForwarderConfig {
        match self.forward_timeout_secs {
            Some(secs) => ForwarderConfig::with_timeout(Duration::from_secs(secs)),
            None => ForwarderConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log))
        .init();

    let relay = AppBuilder::new()
        .backend(cli.backend_config())
        .forwarder_config(cli.forwarder_config())
        .build()
        .await
        .context("failed to start relay")?;
    let relay = Arc::new(relay);

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;

    serve(listener, relay.clone(), shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down");
    relay.shutdown().await.context("failed to close history store")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
