//! Resource endpoint protocol shared by every entity.
//!
//! Each function turns one decoded HTTP request into store calls and maps the
//! outcome onto a status code and JSON body:
//!
//! | Outcome   | Create       | Update / Patch        | Delete       |
//! |-----------|--------------|-----------------------|--------------|
//! | applied   | 201, entity  | 200, entity or fields | 200, count   |
//! | not found | 409, code    | 404, code             | 404, code    |
//!
//! A load that finds nothing answers 404 with a JSON `null` body.
//! | conflict  | 409, code    | 409, code             | 404, code    |
//!
//! Decode and validation failures are answered before the store is called.
//! Store failures are logged with a masked snapshot of the request and
//! surface as redacted internal errors.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::domain::ports::ServiceError;
use crate::domain::validation::{self, ValidationFailure, ValidationScope};
use crate::domain::{
    Entity, Error, Outcome, ResultCode, SearchCriteria, build_patch, read_entity, read_object,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::INTERNAL_MESSAGE;
use crate::inbound::http::state::ResourceEndpoint;

/// `GET /{resource}`: every stored entity.
pub async fn all<T, F>(endpoint: &ResourceEndpoint<T, F>) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let entities = endpoint
        .service()
        .all()
        .await
        .map_err(|err| store_failure(endpoint, "all", &err, &Value::Null))?;
    Ok(HttpResponse::Ok().json(entities))
}

/// `GET /{resource}/{key...}`: one entity, or 404 with a `null` body.
pub async fn load<T, F>(endpoint: &ResourceEndpoint<T, F>, path: &[&str]) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let metadata = endpoint.metadata();
    let keys = metadata.bind_keys(path)?;
    let loaded = endpoint
        .service()
        .load(&keys)
        .await
        .map_err(|err| store_failure(endpoint, "load", &err, &keys))?;
    Ok(match loaded {
        Some(entity) => HttpResponse::Ok().json(entity),
        None => {
            info!(
                resource = metadata.resource_name(),
                keys = %keys,
                "load found nothing"
            );
            HttpResponse::NotFound().json(Value::Null)
        }
    })
}

/// `POST /{resource}`: insert a new entity.
pub async fn create<T, F>(endpoint: &ResourceEndpoint<T, F>, body: &[u8]) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let action = endpoint.metadata().actions().create.as_str();
    let entity = read_entity::<T>(read_object(body)?)?;
    validate(endpoint, action, &entity, ValidationScope::Full).await?;

    let code = endpoint
        .service()
        .create(&entity)
        .await
        .map_err(|err| store_failure(endpoint, action, &err, &entity))?;
    Ok(match code.outcome() {
        Outcome::Applied(_) => HttpResponse::Created().json(&entity),
        Outcome::NotFound | Outcome::Conflict(_) => rejected(endpoint, action, StatusCode::CONFLICT, code),
    })
}

/// `PUT /{resource}/{key...}`: replace an existing entity.
///
/// The key comes from the path; a different key in the body is rejected.
pub async fn update<T, F>(
    endpoint: &ResourceEndpoint<T, F>,
    path: &[&str],
    body: &[u8],
) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let metadata = endpoint.metadata();
    let action = metadata.actions().update.as_str();
    let keys = metadata.bind_keys(path)?;
    let mut fields = read_object(body)?;
    metadata.check_keys(&mut fields, &keys)?;
    let entity = read_entity::<T>(fields)?;
    validate(endpoint, action, &entity, ValidationScope::Full).await?;

    let code = endpoint
        .service()
        .update(&entity)
        .await
        .map_err(|err| store_failure(endpoint, action, &err, &entity))?;
    Ok(match code.outcome() {
        Outcome::Applied(_) => HttpResponse::Ok().json(&entity),
        Outcome::NotFound => rejected(endpoint, action, StatusCode::NOT_FOUND, code),
        Outcome::Conflict(_) => rejected(endpoint, action, StatusCode::CONFLICT, code),
    })
}

/// `PATCH /{resource}/{key...}`: write only the fields the client sent.
pub async fn patch<T, F>(
    endpoint: &ResourceEndpoint<T, F>,
    path: &[&str],
    body: &[u8],
) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let metadata = endpoint.metadata();
    let action = metadata.actions().patch.as_str();
    let keys = metadata.bind_keys(path)?;
    let patch = build_patch::<T>(body, metadata, &keys)?;
    validate(
        endpoint,
        action,
        &patch.entity,
        ValidationScope::Partial(&patch.fields),
    )
    .await?;

    let code = endpoint
        .service()
        .patch(&patch.fields)
        .await
        .map_err(|err| store_failure(endpoint, action, &err, &patch.fields))?;
    Ok(match code.outcome() {
        Outcome::Applied(_) => HttpResponse::Ok().json(&patch.fields),
        Outcome::NotFound => rejected(endpoint, action, StatusCode::NOT_FOUND, code),
        Outcome::Conflict(_) => rejected(endpoint, action, StatusCode::CONFLICT, code),
    })
}

/// `DELETE /{resource}/{key...}`: remove an entity.
pub async fn delete<T, F>(endpoint: &ResourceEndpoint<T, F>, path: &[&str]) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let metadata = endpoint.metadata();
    let action = metadata.actions().delete.as_str();
    let keys = metadata.bind_keys(path)?;
    let code = endpoint
        .service()
        .delete(&keys)
        .await
        .map_err(|err| store_failure(endpoint, action, &err, &keys))?;
    Ok(match code.outcome() {
        Outcome::Applied(count) => HttpResponse::Ok().json(count),
        Outcome::NotFound | Outcome::Conflict(_) => {
            rejected(endpoint, action, StatusCode::NOT_FOUND, code)
        }
    })
}

/// `GET /{resource}/search?...`: one page of matches plus the total.
pub async fn search<T, F>(endpoint: &ResourceEndpoint<T, F>, query: &str) -> ApiResult<HttpResponse>
where
    T: Entity,
    F: SearchCriteria,
{
    let filter = endpoint
        .search()
        .decode(url::form_urlencoded::parse(query.as_bytes()))?;
    let (limit, offset) = (filter.page.limit(), filter.page.offset());
    debug!(
        resource = endpoint.metadata().resource_name(),
        limit, offset, "searching"
    );
    let result = endpoint
        .service()
        .search(&filter, limit, offset)
        .await
        .map_err(|err| store_failure(endpoint, "search", &err, &filter))?;
    Ok(HttpResponse::Ok().json(result))
}

async fn validate<T, F>(
    endpoint: &ResourceEndpoint<T, F>,
    action: &str,
    entity: &T,
    scope: ValidationScope<'_>,
) -> Result<(), Error>
where
    T: Entity,
    F: SearchCriteria,
{
    match validation::run(endpoint.validator(), entity, scope).await {
        Ok(()) => Ok(()),
        Err(failure @ ValidationFailure::Invalid(_)) => {
            debug!(
                resource = endpoint.metadata().resource_name(),
                action, "request failed validation"
            );
            Err(failure.into_error())
        }
        Err(ValidationFailure::Validator(err)) => {
            error!(
                resource = endpoint.metadata().resource_name(),
                action,
                kind = err.kind(),
                error = %err,
                entity = %endpoint.masker().masked(entity),
                "validator failed"
            );
            Err(Error::internal(INTERNAL_MESSAGE))
        }
    }
}

fn rejected<T, F>(
    endpoint: &ResourceEndpoint<T, F>,
    action: &str,
    status: StatusCode,
    code: ResultCode,
) -> HttpResponse
where
    T: Entity,
    F: SearchCriteria,
{
    info!(
        resource = endpoint.metadata().resource_name(),
        action,
        status = status.as_u16(),
        result = code.value(),
        "{action} not applied"
    );
    HttpResponse::build(status).json(code)
}

fn store_failure<T, F, C>(
    endpoint: &ResourceEndpoint<T, F>,
    action: &str,
    err: &ServiceError,
    context: &C,
) -> Error
where
    T: Entity,
    F: SearchCriteria,
    C: Serialize + ?Sized,
{
    error!(
        resource = endpoint.metadata().resource_name(),
        action,
        kind = err.kind(),
        error = %err,
        context = %endpoint.masker().masked(context),
        "store call failed"
    );
    Error::internal(INTERNAL_MESSAGE)
}
