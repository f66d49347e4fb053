//! Handler tests for the user resource, driven through a mocked store.

use std::io;
use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use pagination::{PageLimits, SearchResult};
use rstest::rstest;
use serde_json::{Value, json};

use super::configure;
use crate::Trace;
use crate::domain::ports::{MockEntityService, MockValidator, ServiceError, Validator, ValidatorError};
use crate::domain::{
    ActionLabels, Filter, LogMasker, ResultCode, TRACE_ID_HEADER, User, UserFilter, UserValidator,
};
use crate::inbound::http::state::{ResourcePorts, UsersEndpoint};

fn ada() -> User {
    User {
        id: "u1".to_owned(),
        username: "ada".to_owned(),
        email: Some("ada@example.org".to_owned()),
        phone: "0123456789".to_owned(),
        date_of_birth: None,
    }
}

fn endpoint_with(
    service: MockEntityService,
    validator: Arc<dyn Validator<Entity = User>>,
) -> UsersEndpoint {
    UsersEndpoint::resolve(
        ResourcePorts {
            service: Arc::new(service),
            validator,
        },
        ActionLabels::default(),
        PageLimits::default(),
        LogMasker::default(),
    )
    .expect("user endpoint resolves")
}

fn endpoint(service: MockEntityService) -> UsersEndpoint {
    endpoint_with(service, Arc::new(UserValidator))
}

/// A store that fails the test if any mutation reaches it.
fn untouched_store() -> MockEntityService {
    let mut service = MockEntityService::new();
    service.expect_create().never();
    service.expect_update().never();
    service.expect_patch().never();
    service
}

/// Shared buffer the fmt subscriber writes log lines into.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer lock")).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Reply {
    status: StatusCode,
    trace_id: Option<String>,
    raw: String,
    body: Value,
}

async fn call(endpoint: UsersEndpoint, request: TestRequest) -> Reply {
    let app = test::init_service(
        App::new()
            .wrap(Trace)
            .app_data(web::Data::new(endpoint))
            .service(web::scope("/api/v1").configure(configure)),
    )
    .await;
    let response = test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let trace_id = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = test::read_body(response).await;
    let raw = String::from_utf8_lossy(&bytes).into_owned();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    Reply {
        status,
        trace_id,
        raw,
        body,
    }
}

#[rstest]
#[actix_web::test]
async fn list_returns_every_user() {
    let mut service = MockEntityService::new();
    service.expect_all().times(1).returning(|| Ok(vec![ada()]));

    let reply = call(endpoint(service), TestRequest::get().uri("/api/v1/users")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body[0]["username"], "ada");
    assert!(reply.trace_id.is_some());
}

#[rstest]
#[actix_web::test]
async fn load_missing_user_is_not_found() {
    let mut service = MockEntityService::new();
    service
        .expect_load()
        .withf(|keys| keys.canonical() == "u404")
        .returning(|_| Ok(None));

    let reply = call(endpoint(service), TestRequest::get().uri("/api/v1/users/u404")).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.raw, "null");
    assert!(reply.trace_id.is_some());
}

#[rstest]
#[actix_web::test]
async fn load_existing_user_returns_it() {
    let mut service = MockEntityService::new();
    service.expect_load().returning(|_| Ok(Some(ada())));

    let reply = call(endpoint(service), TestRequest::get().uri("/api/v1/users/u1")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, serde_json::to_value(ada()).expect("serialise user"));
}

#[rstest]
#[case::applied(1, StatusCode::CREATED)]
#[case::duplicate(-1, StatusCode::CONFLICT)]
#[case::zero(0, StatusCode::CONFLICT)]
#[actix_web::test]
async fn create_maps_result_codes(#[case] code: i64, #[case] expected: StatusCode) {
    let mut service = MockEntityService::new();
    service
        .expect_create()
        .withf(|user| user.id == "u1")
        .times(1)
        .returning(move |_| Ok(ResultCode::new(code)));

    let reply = call(
        endpoint(service),
        TestRequest::post().uri("/api/v1/users").set_json(ada()),
    )
    .await;

    assert_eq!(reply.status, expected);
    if expected == StatusCode::CREATED {
        assert_eq!(reply.body["id"], "u1");
    } else {
        assert_eq!(reply.body, json!(code));
    }
}

#[rstest]
#[actix_web::test]
async fn invalid_user_never_reaches_the_store() {
    let user = User {
        phone: "call me".to_owned(),
        ..ada()
    };

    let reply = call(
        endpoint(untouched_store()),
        TestRequest::post().uri("/api/v1/users").set_json(user),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["details"]["code"], "validation_failed");
    assert_eq!(reply.body["details"]["errors"][0]["field"], "phone");
}

#[rstest]
#[case::not_json("{")]
#[case::array("[]")]
#[case::wrong_type(r#"{"id":7}"#)]
#[actix_web::test]
async fn malformed_bodies_are_rejected(#[case] body: &'static str) {
    let reply = call(
        endpoint(untouched_store()),
        TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(("content-type", "application/json"))
            .set_payload(body),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "invalid_request");
}

#[rstest]
#[case::applied(1, StatusCode::OK)]
#[case::missing(0, StatusCode::NOT_FOUND)]
#[case::conflict(-1, StatusCode::CONFLICT)]
#[actix_web::test]
async fn update_maps_result_codes(#[case] code: i64, #[case] expected: StatusCode) {
    let mut service = MockEntityService::new();
    service
        .expect_update()
        .withf(|user| user.id == "u1" && user.username == "ada")
        .returning(move |_| Ok(ResultCode::new(code)));
    let body = json!({"username": "ada", "phone": "0123456789"});

    let reply = call(
        endpoint(service),
        TestRequest::put().uri("/api/v1/users/u1").set_json(body),
    )
    .await;

    assert_eq!(reply.status, expected);
    if code > 0 {
        assert_eq!(reply.body["id"], "u1");
    } else {
        assert_eq!(reply.body, json!(code));
    }
}

#[rstest]
#[actix_web::test]
async fn update_rejects_a_different_key_in_the_body() {
    let reply = call(
        endpoint(untouched_store()),
        TestRequest::put().uri("/api/v1/users/u1").set_json(User {
            id: "u2".to_owned(),
            ..ada()
        }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["details"]["code"], "key_mismatch");
}

#[rstest]
#[actix_web::test]
async fn patch_writes_and_echoes_only_supplied_fields() {
    let mut service = MockEntityService::new();
    service
        .expect_patch()
        .withf(|fields| fields.names().collect::<Vec<_>>() == vec!["id", "phone"])
        .times(1)
        .returning(|_| Ok(ResultCode::APPLIED));

    let reply = call(
        endpoint(service),
        TestRequest::patch()
            .uri("/api/v1/users/u42")
            .set_json(json!({"id": "ignored", "phone": "5550100", "isAdmin": true})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    insta::assert_json_snapshot!(reply.body, @r#"
    {
      "id": "u42",
      "phone": "5550100"
    }
    "#);
}

#[rstest]
#[case::missing(0, StatusCode::NOT_FOUND)]
#[case::conflict(-1, StatusCode::CONFLICT)]
#[actix_web::test]
async fn patch_maps_rejections(#[case] code: i64, #[case] expected: StatusCode) {
    let mut service = MockEntityService::new();
    service
        .expect_patch()
        .returning(move |_| Ok(ResultCode::new(code)));

    let reply = call(
        endpoint(service),
        TestRequest::patch()
            .uri("/api/v1/users/u1")
            .set_json(json!({"username": "grace"})),
    )
    .await;

    assert_eq!(reply.status, expected);
    assert_eq!(reply.body, json!(code));
}

#[rstest]
#[actix_web::test]
async fn patch_only_judges_supplied_fields() {
    let reply = call(
        endpoint(untouched_store()),
        TestRequest::patch()
            .uri("/api/v1/users/u1")
            .set_json(json!({"email": "not-an-address"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let errors = reply.body["details"]["errors"]
        .as_array()
        .expect("field errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "email");
}

#[rstest]
#[case::removed(1, StatusCode::OK)]
#[case::missing(0, StatusCode::NOT_FOUND)]
#[case::negative(-1, StatusCode::NOT_FOUND)]
#[actix_web::test]
async fn delete_maps_result_codes(#[case] code: i64, #[case] expected: StatusCode) {
    let mut service = MockEntityService::new();
    service
        .expect_delete()
        .withf(|keys| keys.canonical() == "u1")
        .returning(move |_| Ok(ResultCode::new(code)));

    let reply = call(endpoint(service), TestRequest::delete().uri("/api/v1/users/u1")).await;

    assert_eq!(reply.status, expected);
    assert_eq!(reply.body, json!(code));
}

#[rstest]
#[actix_web::test]
async fn search_passes_limit_and_offset() {
    let mut service = MockEntityService::new();
    service
        .expect_search()
        .withf(|filter: &Filter<UserFilter>, limit: &u32, offset: &u64| {
            filter.criteria.username.as_deref() == Some("ad") && *limit == 5 && *offset == 5
        })
        .times(1)
        .returning(|_, _, _| Ok(SearchResult::new(vec![ada()], 6)));

    let reply = call(
        endpoint(service),
        TestRequest::get().uri("/api/v1/users/search?username=ad&page=2&limit=5&colour=blue"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total"], 6);
    assert_eq!(reply.body["list"][0]["id"], "u1");
}

#[rstest]
#[actix_web::test]
async fn search_rejects_malformed_values() {
    let mut service = MockEntityService::new();
    service.expect_search().never();

    let reply = call(
        endpoint(service),
        TestRequest::get().uri("/api/v1/users/search?dateOfBirth.min=yesterday"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["details"]["code"], "invalid_timestamp");
}

#[rstest]
#[actix_web::test]
async fn store_failures_are_redacted() {
    let mut service = MockEntityService::new();
    service
        .expect_update()
        .returning(|_| Err(ServiceError::connection("socket closed by 10.0.0.7")));

    let reply = call(
        endpoint(service),
        TestRequest::put().uri("/api/v1/users/u1").set_json(ada()),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["message"], "Internal server error");
    assert!(reply.body.get("details").is_none());
    assert_eq!(reply.body["traceId"].as_str(), reply.trace_id.as_deref());
}

#[rstest]
#[actix_web::test]
async fn store_failure_logs_mask_the_phone() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut service = MockEntityService::new();
    service
        .expect_create()
        .times(1)
        .returning(|_| Err(ServiceError::connection("socket closed")));

    let reply = call(
        endpoint(service),
        TestRequest::post().uri("/api/v1/users").set_json(ada()),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let captured = logs.contents();
    assert!(captured.contains("store call failed"), "logs: {captured}");
    assert!(captured.contains("012*******"), "logs: {captured}");
    assert!(!captured.contains("0123456789"), "logs: {captured}");
}

#[rstest]
#[actix_web::test]
async fn created_user_echoes_the_unmasked_phone() {
    let mut service = MockEntityService::new();
    service
        .expect_create()
        .times(1)
        .returning(|_| Ok(ResultCode::APPLIED));

    let reply = call(
        endpoint(service),
        TestRequest::post().uri("/api/v1/users").set_json(ada()),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["phone"], "0123456789");
}

#[rstest]
#[actix_web::test]
async fn validator_failures_are_internal_errors() {
    let mut validator = MockValidator::new();
    validator
        .expect_validate()
        .returning(|_| Err(ValidatorError::rule("phone", "rule table missing")));

    let reply = call(
        endpoint_with(untouched_store(), Arc::new(validator)),
        TestRequest::post().uri("/api/v1/users").set_json(ada()),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["code"], "internal_error");
}
