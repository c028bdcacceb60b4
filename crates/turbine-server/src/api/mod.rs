pub mod response;

use crate::{
    config::Config,
    error::AppResult,
    features::{self, FeatureState},
    middleware,
};
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::{
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::{net::TcpListener, signal, sync::Notify};
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};
use turbine_common::store::MeasurementStore;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(state.store.clone());

    Router::new()
        .route("/", get(root))
        .merge(health_routes)
        .merge(features::router(state))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(config: Config, store: Arc<dyn MeasurementStore>) -> anyhow::Result<()> {
    let app = create_router(FeatureState::new(store), &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    serve_until(
        listener,
        app,
        shutdown_signal(),
        Duration::from_secs(config.server.shutdown_timeout_secs),
    )
    .await
}

/// Serve `app` until `signal` resolves, then stop accepting connections and
/// give in-flight requests up to `drain_timeout` to finish.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain_timeout: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let stopping = Arc::new(Notify::new());
    let notify = stopping.clone();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            info!(
                "Waiting up to {} seconds for connections to close",
                drain_timeout.as_secs()
            );
            notify.notify_one();
        })
        .into_future();

    let drain_deadline = async {
        stopping.notified().await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = server => {
            result?;
            info!("Server shut down gracefully");
        },
        _ = drain_deadline => {
            warn!("Shutdown timeout elapsed with connections still open");
        },
    }

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Turbine Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health(State(store): State<Arc<dyn MeasurementStore>>) -> AppResult<impl IntoResponse> {
    store.health_check().await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "connected"
    })))
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
    use tokio::{io::AsyncWriteExt, net::TcpStream, sync::oneshot};

    async fn local_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_stops_promptly_when_idle() {
        let (listener, _) = local_listener().await;
        let app = Router::new().route("/", get(root));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve_until(listener, app, async {}, Duration::from_secs(30)),
        )
        .await;

        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_drain_timeout_bounds_stuck_requests() {
        let (listener, addr) = local_listener().await;
        let app = Router::new().route(
            "/stuck",
            get(|| async { std::future::pending::<&'static str>().await }),
        );

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(
            listener,
            app,
            async {
                let _ = stop_rx.await;
            },
            Duration::from_millis(100),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /stuck HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(()).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(finished.unwrap().unwrap().is_ok());
    }
}
