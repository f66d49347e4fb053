//! Tests for HTTP error mapping.

use super::*;
use actix_web::body::to_bytes;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("store exploded: password=hunter2")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

async fn read_error(response: HttpResponse) -> Error {
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("error envelope decodes")
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("taken"), StatusCode::CONFLICT)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error: Error) {
    let response = ResponseError::error_response(&internal_error);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .expect("trace-id header")
        .to_str()
        .expect("ascii header");
    assert_eq!(header, TRACE_ID);

    let payload = read_error(response).await;
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), INTERNAL_MESSAGE);
    assert_eq!(payload.trace_id(), Some(TRACE_ID));
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::invalid_request("validation failed")
        .with_details(json!({"code": "validation_failed", "errors": []}));

    let response = ResponseError::error_response(&error);
    assert!(response.headers().get(TRACE_ID_HEADER).is_none());
    let payload = read_error(response).await;

    assert_eq!(payload.message(), "validation failed");
    assert_eq!(
        payload.details(),
        Some(&json!({"code": "validation_failed", "errors": []}))
    );
}

#[rstest]
fn redaction_leaves_client_errors_untouched() {
    let error = Error::not_found("user u1 not found");
    assert_eq!(redact_if_internal(&error), error);
}
