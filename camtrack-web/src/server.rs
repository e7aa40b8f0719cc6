use std::net::SocketAddr;
use std::thread;

use crate::routes::router;
use crate::state::HealthState;

/// Runs the healthcheck/metrics HTTP surface on its own OS thread, with its
/// own single-threaded tokio runtime — matching the "one healthcheck-server
/// rather than pulling the rest of the (thread-per-role, non-async)
/// pipeline onto a shared runtime.
pub fn spawn_healthcheck_server(port: u16, state: HealthState) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("camtrack-healthcheck".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build healthcheck runtime");

            runtime.block_on(async move {
                let addr = SocketAddr::from(([0, 0, 0, 0], port));
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(err) => {
                        tracing::error!(error = %err, port, "failed to bind healthcheck listener");
                        return;
                    }
                };
                tracing::info!(port, "healthcheck server listening");
                if let Err(err) = axum::serve(listener, router(state)).await {
                    tracing::error!(error = %err, "healthcheck server exited with error");
                }
            });
        })
        .expect("failed to spawn healthcheck thread")
}
