use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use hims_server::{create_app, HimsServer, ServerSettings};

/// HIMS Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "hims-server")]
#[command(about = "Hospital information management HTTP API server")]
struct Args {
    /// Configuration file (TOML or YAML); missing files are ignored
    #[arg(short, long, env = "HIMS_CONFIG")]
    config: Option<String>,

    /// Server bind address, overrides `server.host`
    #[arg(long, env = "HIMS_HOST")]
    host: Option<String>,

    /// Server port, overrides `server.port`
    #[arg(short, long, env = "HIMS_PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit structured JSON logs
    #[arg(long, env = "HIMS_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings =
        ServerSettings::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if args.json_logs {
        settings.logging.json = true;
    }

    init_tracing(&settings, args.verbose)?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("{}", "Starting HIMS Engine HTTP Server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Bind address: {}", addr.bright_yellow());

    let server = HimsServer::new(settings).await?;
    server.bootstrap().await?;
    info!("Storage backend: {}", server.db.backend());

    let app = create_app(server);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("{}", format!("HIMS Engine running on http://{addr}").bright_green());
    info!("{}", format!("Health check: http://{addr}/health").bright_blue());
    info!("{}", format!("API v1: http://{addr}/api/v1").bright_blue());
    info!("{}", format!("Notifications: ws://{addr}/ws/notifications").bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for the shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

fn init_tracing(settings: &ServerSettings, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { settings.logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("hims_server={level},tower_http={level},sqlx=warn,{level}").into()
    });

    if settings.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
            .context("Failed to install the log subscriber")?;
        return Ok(());
    }

    let use_colors = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(verbose)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(use_colors),
        )
        .try_init()
        .context("Failed to install the log subscriber")?;

    if use_colors {
        print_startup_banner();
    }
    Ok(())
}

fn print_startup_banner() {
    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════════╗".bright_cyan()
    );
    println!(
        "{}",
        "║                         HIMS ENGINE                          ║".bright_cyan()
    );
    println!(
        "{}",
        "║            Hospital Information Management System            ║".bright_cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝".bright_cyan()
    );
    println!();
}
