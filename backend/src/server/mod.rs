//! Server construction and middleware wiring.

mod config;

pub use config::ServerSettings;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use users_api::Trace;
#[cfg(debug_assertions)]
use users_api::doc::ApiDoc;
use users_api::domain::{AttributeMetadata, SearchParameters, User, UserValidator};
use users_api::inbound::http::health::{HealthState, live, ready};
use users_api::inbound::http::state::{ResourcePorts, UsersEndpoint};
use users_api::inbound::http::users;
use users_api::outbound::persistence::UserStore;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Build the user endpoint backed by the in-memory store.
///
/// # Errors
/// Returns [`std::io::Error`] when the settings or the user schema are
/// invalid.
pub fn build_users_endpoint(settings: &ServerSettings) -> std::io::Result<UsersEndpoint> {
    let limits = settings.search_limits().map_err(std::io::Error::other)?;
    let masker = settings.masker().map_err(std::io::Error::other)?;
    let metadata = Arc::new(
        AttributeMetadata::resolve::<User>(settings.action_labels())
            .map_err(std::io::Error::other)?,
    );
    let search = SearchParameters::resolve(&metadata, limits).map_err(std::io::Error::other)?;
    let ports = ResourcePorts {
        service: Arc::new(UserStore::new(Arc::clone(&metadata))),
        validator: Arc::new(UserValidator),
    };
    Ok(UsersEndpoint::new(ports, metadata, search, masker))
}

fn build_app(
    health_state: web::Data<HealthState>,
    users_endpoint: web::Data<UsersEndpoint>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1").configure(users::configure);

    let app = App::new()
        .app_data(health_state)
        .app_data(users_endpoint)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct the HTTP server.
///
/// # Errors
/// Propagates [`std::io::Error`] when the settings are invalid or binding the
/// socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    settings: &ServerSettings,
) -> std::io::Result<Server> {
    let users_endpoint = web::Data::new(build_users_endpoint(settings)?);
    let server_health_state = health_state.clone();
    let bind_addr = settings.bind_addr();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), users_endpoint.clone())
    })
    .bind(bind_addr.clone())?
    .run();

    info!(host = %bind_addr.0, port = bind_addr.1, "users API listening");
    health_state.mark_ready();
    Ok(server)
}
