//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every user and health endpoint together with the
//! schema wrappers from [`crate::inbound::http::schemas`]. Swagger UI serves
//! it in debug builds and `openapi-dump` prints it for external tooling.

use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, FieldErrorSchema, UserSchema, UserSearchResultSchema,
};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Users resource API",
        description = "CRUD, partial update and paginated search over users."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::search_users,
        crate::inbound::http::users::load_user,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::patch_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        UserSchema,
        UserSearchResultSchema,
        ErrorSchema,
        ErrorCodeSchema,
        FieldErrorSchema
    )),
    tags(
        (name = "users", description = "User resource operations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
