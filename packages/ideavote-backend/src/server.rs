/// HTTP server: axum with permissive CORS, served until Ctrl-C.
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::api::api_router;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_router().layer(cors).with_state(state)
}

pub async fn bind(state: &AppState) -> std::io::Result<TcpListener> {
    TcpListener::bind(format!("{}:{}", state.bind_address, state.port)).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    log::info!(target: "ideavote.server", "HTTP server listening on http://{}", addr);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Spawn the server on a background task; returns the bound port.
pub async fn spawn_server(state: AppState) -> std::io::Result<u16> {
    let listener = bind(&state).await?;
    let actual_port = listener.local_addr()?.port();

    tokio::spawn(async move {
        if let Err(e) = serve(listener, state, std::future::pending()).await {
            log::error!(target: "ideavote.server", "HTTP server exited with error: {}", e);
        }
    });

    Ok(actual_port)
}

pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!(target: "ideavote.server", "Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!(target: "ideavote.server", "Shutdown requested");
}
