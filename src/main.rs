//! Running Mate Back binary entrypoint wiring REST, SSE, the sweeps and the selected store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use running_mate_back::{
    config::AppConfig,
    dao::run_store::{MemoryRunStore, RunStore},
    routes,
    services::{scheduler::Scheduler, sweeps::rotate_quick_match},
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the persistence backend.
const STORE_ENV: &str = "RUNNING_MATE_STORE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = select_store().await?;
    let app_state = AppState::new(store, config);

    if app_state.config().quick_match.rotate_on_startup {
        let group = rotate_quick_match(&app_state, app_state.now())
            .await
            .context("opening the initial quick match group")?;
        info!(group_id = %group.id, "quick match group ready");
    }
    let scheduler = Scheduler::start(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    scheduler.shutdown().await;
    Ok(())
}

/// Pick the store named by [`STORE_ENV`], defaulting to the in-memory one.
async fn select_store() -> anyhow::Result<Arc<dyn RunStore>> {
    let choice = env::var(STORE_ENV).unwrap_or_else(|_| "memory".into());
    match choice.trim().to_ascii_lowercase().as_str() {
        "" | "memory" => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryRunStore::new()))
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use running_mate_back::dao::run_store::mongodb::{MongoConfig, MongoRunStore};

            let config = MongoConfig::from_env()
                .await
                .context("reading MongoDB settings")?;
            let store = MongoRunStore::connect(config)
                .await
                .context("connecting to MongoDB")?;
            info!("using MongoDB store");
            Ok(Arc::new(store))
        }
        other => {
            warn!(store = other, "unsupported store requested");
            bail!("unsupported {STORE_ENV} value `{other}`")
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
