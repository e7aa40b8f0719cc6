//! The healthcheck/metrics HTTP surface: `GET /healthz`, `GET /readyz`,
//! both backed by atomic flags the Supervisor owns, plus a `/metrics`
//! snapshot endpoint.

mod routes;
mod server;
mod state;

pub use routes::router;
pub use server::spawn_healthcheck_server;
pub use state::HealthState;
