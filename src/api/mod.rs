//! HTTP transport for the captcha pipeline.

pub mod handlers;
pub mod response;
pub mod router;
pub mod state;

use std::net::SocketAddr;

pub use response::Envelope;
pub use router::captcha_router;
pub use state::AppState;

/// Serve the API until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "captcha API listening");

    axum::serve(listener, captcha_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
