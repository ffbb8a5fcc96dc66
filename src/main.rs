use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use leasebot_backend::core;
use leasebot_backend::server;
use leasebot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    core::logging::init(&state.paths);

    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("LEASEBOT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "Using {} with index {} (top_k = {})",
        state.llm_name,
        state.index_name,
        state.settings.vector_index.top_k
    );

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
