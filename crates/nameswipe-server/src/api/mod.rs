//! HTTP application assembly
//!
//! Builds the router, wires shared state, and runs the server until a shutdown
//! signal arrives.

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use nameswipe_ingest::{IngestionOrchestrator, PgNameCatalog};
use serde_json::json;
use sqlx::PgPool;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::features;
use crate::middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub orchestrator: IngestionOrchestrator,
}

/// Connect, migrate, and serve until shut down
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = db::create_pool(&config.database).await?;
    db::run_migrations(&db)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    let catalog = Arc::new(PgNameCatalog::new(db.clone()));
    let orchestrator = IngestionOrchestrator::new(config.ingest.clone(), catalog)?;
    info!(
        batch_size = config.ingest.batch_size,
        source_url_template = %config.ingest.source_url_template,
        "Ingestion orchestrator ready"
    );

    let state = AppState { db, orchestrator };
    let app = create_router(state, &config);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    // Event streams never end on their own, so draining is bounded
    let drain_deadline = async {
        if signalled_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        info!(
            timeout = ?config.server.shutdown_timeout,
            "Waiting for open connections to close"
        );
        tokio::time::sleep(config.server.shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result?;
            info!("Server shut down gracefully");
        },
        _ = drain_deadline => {
            warn!("Connections still open after shutdown timeout, closing");
        },
    }
    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        orchestrator: state.orchestrator.clone(),
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api/v1", features::router(feature_state))
        // Applied innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    db::health_check(&state.db).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "database": "connected"
        })),
    )
        .into_response())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use nameswipe_ingest::{IngestConfig, MemoryNameCatalog};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        // Never connects unless a handler touches the database
        let db = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgresql://localhost:1/nameswipe_test")
            .unwrap();
        let orchestrator =
            IngestionOrchestrator::new(IngestConfig::default(), Arc::new(MemoryNameCatalog::new()))
                .unwrap();
        AppState { db, orchestrator }
    }

    #[tokio::test]
    async fn test_ingestion_routes_nested_under_api_v1() {
        let app = create_router(test_state(), &Config::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/ingestion/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_database() {
        let app = create_router(test_state(), &Config::default());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
