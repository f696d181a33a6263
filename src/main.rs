mod adapters;
mod api;
mod bootstrap;
mod config;
mod error;
mod fetch;
mod inventory;
mod middleware;
mod notifications;
mod reconciliation;
mod reports;
mod scheduler;
mod server;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,stock_reconciler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting inventory reconciliation service");

    let config = config::Config::from_env()?;

    let state = bootstrap::initialize_app_state(&config).await?;

    let app = server::create_app(state, &server::ServerOptions::from(&config)).await;

    server::run_server(app, &config.bind_address).await?;

    Ok(())
}
