/// Ideavote backend: config loading, store selection, HTTP server, and a
/// typed client for the vote endpoints.
pub mod api;
pub mod client;
pub mod config;
pub mod github;
pub mod log_bridge;
pub mod server;
pub mod state;

use crate::state::AppState;

/// Run the backend until Ctrl-C.
pub async fn run() -> std::io::Result<()> {
    if let Err(e) = log_bridge::init() {
        eprintln!("failed to initialize backend logger: {}", e);
    }

    let config = config::load();
    let state = AppState::from_config(&config);
    let listener = server::bind(&state).await?;
    server::serve(listener, state, server::shutdown_signal()).await?;

    log::info!(target: "ideavote.server", "Backend stopped");
    Ok(())
}
