use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use shared_database::{Database, DrChronoClient};
use shared_models::scheduling::SchedulingProvider;
use shared_utils::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic kiosk server");

    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("OAuth client or session secret missing; sign-in will not work");
    }

    let store = Database::open(&config.database_path)
        .with_context(|| format!("opening cache store at {}", config.database_path))?;
    let scheduler: Arc<dyn SchedulingProvider> = Arc::new(DrChronoClient::new(&config));
    let port = config.port;

    let state = Arc::new(AppState::new(config, Arc::new(store), scheduler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.context("binding listener")?;
    axum::serve(listener, app).await.context("serving requests")?;

    Ok(())
}
