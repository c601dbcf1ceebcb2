//! HTTP front end of the naming service.
//!
//! Two listeners share one [`NamingService`]: the service listener answers
//! clients, the registration listener accepts storage nodes.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{registration_router, service_router};

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::naming::NamingService;

/// Bind both listeners and serve until ctrl-c.
pub async fn serve(
    service: Arc<NamingService>,
    service_addr: SocketAddr,
    registration_addr: SocketAddr,
) -> Result<()> {
    let service_listener = TcpListener::bind(service_addr).await?;
    let registration_listener = TcpListener::bind(registration_addr).await?;
    serve_on(service, service_listener, registration_listener, shutdown_signal()).await
}

/// Serve on already-bound listeners until `shutdown` resolves.
pub async fn serve_on<F>(
    service: Arc<NamingService>,
    service_listener: TcpListener,
    registration_listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tracing::info!(
        "Naming service listening on {} (registration on {})",
        service_listener.local_addr()?,
        registration_listener.local_addr()?
    );

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let wait_stop = |mut rx: tokio::sync::watch::Receiver<bool>| async move {
        let _ = rx.wait_for(|stopped| *stopped).await;
    };

    let service_server = axum::serve(service_listener, service_router(Arc::clone(&service)))
        .with_graceful_shutdown(wait_stop(stop_rx.clone()));
    let registration_server = axum::serve(registration_listener, registration_router(service))
        .with_graceful_shutdown(wait_stop(stop_rx));

    let trigger = tokio::spawn(async move {
        shutdown.await;
        tracing::info!("Shutting down naming service");
        let _ = stop_tx.send(true);
    });

    let (service_result, registration_result) =
        tokio::join!(service_server.into_future(), registration_server.into_future());
    trigger.abort();
    service_result?;
    registration_result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
