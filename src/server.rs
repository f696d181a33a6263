use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{
        config_status, delete_report, get_report, health_check, latest_report, list_reports,
        run_comparison, test_connection, test_connections, AppState,
    },
    config::Config,
    middleware::{create_cors_layer, rate_limit_middleware, RateLimitLayer},
};

/// HTTP-level knobs taken from configuration
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub run_comparison_per_minute: u32,
    pub cors_allowed_origins: Vec<String>,
}

impl From<&Config> for ServerOptions {
    fn from(config: &Config) -> Self {
        Self {
            run_comparison_per_minute: config.run_comparison_per_minute,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        }
    }
}

pub async fn create_app(state: AppState, options: &ServerOptions) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let run_limit = RateLimitLayer::per_minute(options.run_comparison_per_minute);

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            Router::new()
                .route(
                    "/run-comparison",
                    post(run_comparison).layer(from_fn_with_state(run_limit, rate_limit_middleware)),
                )
                .route("/config-status", get(config_status))
                .route("/test-connections", get(test_connections))
                .route("/test-connection/:source", get(test_connection))
                .route("/reports", get(list_reports))
                .route("/reports/latest", get(latest_report))
                .route("/reports/:id", get(get_report).delete(delete_report)),
        )
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(&options.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await
}
