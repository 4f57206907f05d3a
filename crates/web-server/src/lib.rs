use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::get,
};
use configuration::{Config, ServerSettings};
use database::DbRepository;
use reporting::DashboardReporter;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod handlers;

use auth::Authenticator;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub reporter: DashboardReporter,
    pub authenticator: Arc<dyn Authenticator>,
    /// Cadence of unsolicited KPI pushes on the WebSocket feed.
    pub push_interval: Option<Duration>,
}

impl AppState {
    pub fn new(
        reporter: DashboardReporter,
        authenticator: Arc<dyn Authenticator>,
        push_interval_secs: u64,
    ) -> Self {
        Self {
            reporter,
            authenticator,
            push_interval: (push_interval_secs > 0).then(|| Duration::from_secs(push_interval_secs)),
        }
    }
}

/// Builds the router: the open health check plus the authenticated dashboard.
pub fn app(state: Arc<AppState>, server: &ServerSettings) -> Router {
    let dashboard = Router::new()
        .route("/dashboard/kpis", get(handlers::get_kpis))
        .route("/dashboard/kpis/additional", get(handlers::get_engagement_kpis))
        .route("/dashboard/charts", get(handlers::get_charts))
        .route("/dashboard/recommendations", get(handlers::get_recommendations))
        .route("/dashboard/segments", get(handlers::get_segments))
        .route("/dashboard/top-rewards", get(handlers::get_top_rewards))
        .route("/dashboard/customers", get(handlers::get_customers))
        .route("/rewards", get(handlers::get_rewards))
        .route("/transactions", get(handlers::get_transactions))
        .route("/campaigns", get(handlers::get_campaigns))
        .route("/promotions", get(handlers::get_promotions))
        .route("/staff/customer-lookup", get(handlers::customer_lookup))
        .route("/ws/dashboard/kpis", get(handlers::kpi_feed))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(dashboard)
        .with_state(state)
        .layer(cors_layer(server))
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let origin = if server.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
}

/// The main function to configure and run the web server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    // Note: Tracing is already initialized in main.rs, so we don't need to initialize it again here.
    let db_pool = database::connect(&config.database).await?;
    if config.database.run_migrations {
        database::run_migrations(&db_pool).await?;
    }

    let reporter = DashboardReporter::new(DbRepository::from_pool(db_pool), &config.reporting)?;
    let state = Arc::new(AppState::new(
        reporter,
        auth::from_settings(&config.auth),
        config.reporting.push_interval_secs,
    ));

    let app = app(state, &config.server);
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
