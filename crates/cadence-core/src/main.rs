//! Bootstrap binary: loads configuration, runs migrations, wires the
//! store/evaluator/engine/facade together, starts the engine, and serves
//! an ambient `/health` endpoint. This binary is the operational surface
//! only — the create/list/schedule/etc. operator verbs are exposed as
//! plain methods on `Facade`; no request framing is implemented here, per
//! the scheduler's explicit non-goal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_core::config::{Config, EvaluatorKind};
use cadence_core::store::PgTaskStore;
use cadence_core::{EchoEvaluator, Engine, Evaluator, Executor, Facade, ShellEvaluator, TaskStore};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    scheduler_running: bool,
}

async fn health_check(facade: Arc<Facade>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        scheduler_running: facade.running(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cadence_core=info,warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("cadence starting up");

    let config = Config::from_env()?;
    info!(evaluator = ?config.evaluator, "configuration loaded");

    let store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::connect(&config.database_url)?);
    info!("database migrations applied");

    let evaluator: Arc<dyn Evaluator> = match config.evaluator {
        EvaluatorKind::Shell => Arc::new(ShellEvaluator::new()),
        EvaluatorKind::Echo => Arc::new(EchoEvaluator::new()),
    };

    let executor = Arc::new(Executor::new(store.clone(), evaluator));
    let engine = Engine::new(
        store.clone(),
        executor.clone(),
        Duration::from_millis(config.min_rearm_delay_ms),
        Duration::from_secs(config.max_rearm_delay_secs),
    );
    let facade = Arc::new(Facade::new(store, executor, engine.clone()));

    engine.start().await;
    info!("scheduler engine started");

    let health_facade = facade.clone();
    let health_router = Router::new().route(
        "/health",
        get(move || {
            let facade = health_facade.clone();
            async move { health_check(facade).await }
        }),
    );
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    info!(port = config.http_port, "health endpoint listening");
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_router).await {
            tracing::error!(error = %e, "health server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    engine.stop().await;
    server.abort();

    Ok(())
}
