use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pdf_range_server::config::Config;
use pdf_range_server::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_range_server=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();
    let options = config.serve_options();

    if !options.root.is_dir() {
        tracing::warn!(root = %options.root.display(), "document root is not a directory");
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    info!(
        addr = %config.bind,
        root = %options.root.display(),
        chunk_size = options.streamer.chunk_size(),
        range_end = ?options.range_end,
        throttle = ?options.throttle,
        "serving documents",
    );

    axum::serve(listener, server::router(options))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
