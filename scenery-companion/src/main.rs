//! # Scenery Companion Server
//!
//! Single-slot persistence companion for local development. The editor
//! mirrors its working scene here so it survives reloads and is
//! reachable from other devices on the local network.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scenery_companion::{router, CompanionState};

/// Command-line options.
#[derive(Debug, Parser)]
#[command(name = "scenery-companion", version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, env = "SCENERY_COMPANION_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Path of the single-slot config file.
    #[arg(long, env = "SCENERY_CONFIG_FILE", default_value = "config.json")]
    config: PathBuf,
}

/// Initialize structured tracing.
///
/// Set `RUST_LOG` to control log levels (default:
/// info,scenery_companion=debug,tower_http=debug). Set
/// `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scenery_companion=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let state = CompanionState::new(&args.config);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("companion server listening on http://{addr}/");
    tracing::info!("config slot: {}", args.config.display());

    axum::serve(listener, app).await?;
    Ok(())
}
