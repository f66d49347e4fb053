//! Users API entry-point: loads settings, initialises logging and serves
//! the REST endpoints.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerSettings, create_server};
use users_api::inbound::http::health::HealthState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load()
        .map_err(|err| std::io::Error::other(format!("failed to load settings: {err}")))?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), &settings)?;
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
