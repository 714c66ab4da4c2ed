pub mod handlers;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the HTTP app: WebSocket signaling everywhere, plus `/api` when enabled.
pub fn router(state: ApiState, api_enabled: bool) -> Router {
    let mut app: Router<ApiState> = Router::new();

    if api_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api_routes = Router::new()
            .route("/status", get(handlers::handle_status))
            .route("/peers", get(handlers::handle_peers))
            .layer(cors);
        app = app.nest("/api", api_routes);
    }

    app.fallback(handlers::handle_upgrade).with_state(state)
}

/// Serve `app` on `listener` until the shutdown channel fires.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "signaling relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
