//! User resource handlers.
//!
//! ```text
//! GET    /api/v1/users
//! GET    /api/v1/users/search?username=ada&page=2&limit=10&sort=-dateOfBirth
//! GET    /api/v1/users/{id}
//! POST   /api/v1/users          {"id":"u1","username":"ada","phone":"0123456789"}
//! PUT    /api/v1/users/{id}
//! PATCH  /api/v1/users/{id}     {"phone":"0123456780"}
//! DELETE /api/v1/users/{id}
//! ```
//!
//! Handlers only extract the path, query and raw body; the protocol lives in
//! [`crate::inbound::http::resource`].

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};

use crate::inbound::http::ApiResult;
use crate::inbound::http::resource;
use crate::inbound::http::schemas::{
    ErrorSchema, UserSchema, UserSearchParams, UserSearchResultSchema,
};
use crate::inbound::http::state::UsersEndpoint;

/// Register the user routes. `search` is registered before `{id}` so it is
/// not captured as a key.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use users_api::inbound::http::users;
///
/// let app = App::new().service(web::scope("/api/v1").configure(users::configure));
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(search_users)
        .service(list_users)
        .service(create_user)
        .service(load_user)
        .service(update_user)
        .service(patch_user)
        .service(delete_user);
}

/// List every user.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users", body = [UserSchema]),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(endpoint: web::Data<UsersEndpoint>) -> ApiResult<HttpResponse> {
    resource::all(endpoint.get_ref()).await
}

/// Search users with pagination.
#[utoipa::path(
    get,
    path = "/api/v1/users/search",
    params(UserSearchParams),
    responses(
        (status = 200, description = "One page of matching users", body = UserSearchResultSchema),
        (status = 400, description = "Malformed search parameter", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "searchUsers"
)]
#[get("/users/search")]
pub async fn search_users(
    endpoint: web::Data<UsersEndpoint>,
    request: HttpRequest,
) -> ApiResult<HttpResponse> {
    resource::search(endpoint.get_ref(), request.query_string()).await
}

/// Load one user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserSchema),
        (status = 404, description = "No user with this id; body is `null`"),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "loadUser"
)]
#[get("/users/{id}")]
pub async fn load_user(
    endpoint: web::Data<UsersEndpoint>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    resource::load(endpoint.get_ref(), &[id.as_str()]).await
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = UserSchema,
    responses(
        (status = 201, description = "User created", body = UserSchema),
        (status = 400, description = "Malformed or invalid user", body = ErrorSchema),
        (status = 409, description = "Id or username already taken; body is the result code", body = i64),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    endpoint: web::Data<UsersEndpoint>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    resource::create(endpoint.get_ref(), &body).await
}

/// Replace a user.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UserSchema,
    responses(
        (status = 200, description = "User replaced", body = UserSchema),
        (status = 400, description = "Malformed or invalid user, or id mismatch", body = ErrorSchema),
        (status = 404, description = "No user with this id; body is the result code", body = i64),
        (status = 409, description = "Username already taken; body is the result code", body = i64),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[put("/users/{id}")]
pub async fn update_user(
    endpoint: web::Data<UsersEndpoint>,
    id: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    resource::update(endpoint.get_ref(), &[id.as_str()], &body).await
}

/// Change only the supplied fields of a user.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body(content = UserSchema, description = "Any subset of user fields; null clears a field"),
    responses(
        (status = 200, description = "Fields applied, echoed with the id", body = UserSchema),
        (status = 400, description = "Malformed or invalid fields", body = ErrorSchema),
        (status = 404, description = "No user with this id; body is the result code", body = i64),
        (status = 409, description = "Username already taken; body is the result code", body = i64),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "patchUser"
)]
#[patch("/users/{id}")]
pub async fn patch_user(
    endpoint: web::Data<UsersEndpoint>,
    id: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    resource::patch(endpoint.get_ref(), &[id.as_str()], &body).await
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Number of users removed", body = i64),
        (status = 404, description = "No user with this id; body is the result code", body = i64),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    endpoint: web::Data<UsersEndpoint>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    resource::delete(endpoint.get_ref(), &[id.as_str()]).await
}

#[cfg(test)]
mod tests;
