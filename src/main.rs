use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendwatch::config::AppConfig;
use trendwatch::scraper::SessionConfig;
use trendwatch::server::{router, AppState};
use trendwatch::store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "trendwatch",
    about = "Trending-panel scraper with an HTTP trigger API"
)]
struct Cli {
    /// Address to bind the HTTP server on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the HTTP server on
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Run the browser headless (disables the proxy-auth extension)
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let store = SqliteStore::new(&config.database_path, &config.database_table)?;

    let session = SessionConfig {
        login_url: config.login_url.clone(),
        headless: cli.headless,
        ..SessionConfig::default()
    };

    let state = Arc::new(AppState {
        config,
        session,
        store: Box::new(store),
    });

    let addr = format!("{}:{}", cli.host, cli.port);
    info!("trendwatch listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
