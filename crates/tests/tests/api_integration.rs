use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;
use wanderplan_api::{build_app, ApiConfig, GENERATE_PLAN_PATH};
use wanderplan_planner::CompletionConfig;

const SERVICE_KEY: &str = "dev-wanderplan-key";

/// Stand-in for the completion provider, served on an ephemeral port.
#[derive(Clone)]
struct FakeProvider {
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<(String, Value)>>>,
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl FakeProvider {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> (String, Value) {
        self.last_request
            .lock()
            .clone()
            .expect("provider should have been called")
    }
}

async fn fake_completion(
    State(fake): State<FakeProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.hits.fetch_add(1, Ordering::SeqCst);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *fake.last_request.lock() = Some((authorization, body));

    (
        fake.status,
        [(header::CONTENT_TYPE, fake.content_type)],
        fake.body.clone(),
    )
        .into_response()
}

async fn spawn_provider(
    status: StatusCode,
    content_type: &'static str,
    body: String,
) -> (String, FakeProvider) {
    let fake = FakeProvider {
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(None)),
        status,
        content_type,
        body,
    };
    let router = Router::new()
        .route("/api/v1/chat/completions", post(fake_completion))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}/api/v1/chat/completions", address), fake)
}

async fn provider_returning(payload: Value) -> (String, FakeProvider) {
    spawn_provider(StatusCode::OK, "application/json", payload.to_string()).await
}

async fn app_with_provider(endpoint: &str) -> Router {
    let completion = CompletionConfig::new(Some("test-key".to_string())).with_endpoint(endpoint);
    build_app(ApiConfig::default().with_completion(completion))
        .await
        .expect("app should build")
}

fn valid_body() -> Value {
    json!({
        "destination": "Lisbon",
        "startDate": "2024-06-01",
        "endDate": "2024-06-07",
        "budget": "moderate"
    })
}

fn generate_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(GENERATE_PLAN_PATH)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn missing_fields_are_rejected_without_calling_the_provider() {
    let (endpoint, fake) = provider_returning(json!({})).await;

    for field in ["destination", "startDate", "endDate", "budget"] {
        let app = app_with_provider(&endpoint).await;
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove(field);

        let response = app.oneshot(generate_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "field {field}");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let parsed = read_json(response).await;
        assert_eq!(parsed["error"], format!("{field} is required"));
    }

    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn blank_field_counts_as_missing() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let mut body = valid_body();
    body["budget"] = json!("   ");

    let response = app.oneshot(generate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "budget is required");
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn undecodable_json_is_a_gateway_error() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let request = Request::builder()
        .method("POST")
        .uri(GENERATE_PLAN_PATH)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let message = read_json(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("Invalid JSON body"), "{message}");
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn non_object_json_is_a_bad_request() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let response = app
        .oneshot(generate_request(&json!(["Lisbon"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Invalid request body");
    assert_eq!(fake.hits(), 0);
}

fn oversized_body() -> String {
    format!("{{\"destination\": \"{}\"}}", "x".repeat(70 * 1024))
}

#[tokio::test]
async fn large_preflight_still_gets_cors_headers() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let body = oversized_body();
    let request = Request::builder()
        .method("OPTIONS")
        .uri(GENERATE_PLAN_PATH)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "POST, OPTIONS"
    );
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn oversized_post_gets_a_json_error_with_cors() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let body = oversized_body();
    let request = Request::builder()
        .method("POST")
        .uri(GENERATE_PLAN_PATH)
        .header("content-type", "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(read_json(response).await["error"].is_string());
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn preflight_answers_without_touching_the_provider() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri(GENERATE_PLAN_PATH)
        .body(Body::from("this is not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let (endpoint, fake) = provider_returning(json!({})).await;

    for method in ["GET", "PUT", "DELETE"] {
        let app = app_with_provider(&endpoint).await;
        let request = Request::builder()
            .method(method)
            .uri(GENERATE_PLAN_PATH)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(read_json(response).await["error"], "Method not allowed");
    }

    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn missing_api_key_is_a_gateway_error() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let completion = CompletionConfig::new(None).with_endpoint(endpoint);
    let app = build_app(ApiConfig::default().with_completion(completion))
        .await
        .expect("app should build");

    let response = app.oneshot(generate_request(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        read_json(response).await["error"],
        "OPENROUTER_API_KEY not configured"
    );
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn upstream_failure_reports_status_and_body() {
    let (endpoint, fake) = spawn_provider(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/plain",
        "server error".to_string(),
    )
    .await;
    let app = app_with_provider(&endpoint).await;

    let response = app.oneshot(generate_request(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let message = read_json(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("server error"), "{message}");
    assert_eq!(fake.hits(), 1);
}

#[tokio::test]
async fn response_without_content_falls_back() {
    let (endpoint, fake) = provider_returning(json!({ "choices": [] })).await;
    let app = app_with_provider(&endpoint).await;

    let response = app.oneshot(generate_request(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["plan"], "No plan generated");
    assert_eq!(fake.hits(), 1);
}

#[tokio::test]
async fn plan_is_returned_from_the_first_choice() {
    let (endpoint, fake) = provider_returning(json!({
        "choices": [
            { "message": { "role": "assistant", "content": "## Day 1\nBelém" } }
        ]
    }))
    .await;
    let app = app_with_provider(&endpoint).await;

    let response = app.oneshot(generate_request(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(read_json(response).await, json!({ "plan": "## Day 1\nBelém" }));

    let (authorization, payload) = fake.last_request();
    assert_eq!(authorization, "Bearer test-key");
    assert_eq!(payload["model"], "openai/gpt-4o-mini");
    assert_eq!(payload["messages"][0]["role"], "user");

    let prompt = payload["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Create a 7-day travel itinerary for Lisbon."));
    assert!(prompt.contains("- Dates: 2024-06-01 to 2024-06-07"));
}

#[tokio::test]
async fn single_day_trip_counts_as_one_day() {
    let (endpoint, fake) = provider_returning(json!({
        "choices": [{ "message": { "content": "## Day 1" } }]
    }))
    .await;
    let app = app_with_provider(&endpoint).await;

    let mut body = valid_body();
    body["endDate"] = json!("2024-06-01");

    let response = app.oneshot(generate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, payload) = fake.last_request();
    let prompt = payload["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Create a 1-day travel itinerary for Lisbon."));
}

#[tokio::test]
async fn reversed_dates_are_rejected() {
    let (endpoint, fake) = provider_returning(json!({})).await;
    let app = app_with_provider(&endpoint).await;

    let mut body = valid_body();
    body["startDate"] = json!("2024-06-07");
    body["endDate"] = json!("2024-06-01");

    let response = app.oneshot(generate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn health_reports_trip_count() {
    let app = build_app(ApiConfig::default())
        .await
        .expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["trip_count"], 0);
    assert_eq!(parsed["capabilities"]["storage"], "memory");
    assert_eq!(parsed["capabilities"]["completion"], false);
}

fn trip_request(
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", SERVICE_KEY);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let body = body
        .map(|value| Body::from(value.to_string()))
        .unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

fn trip_draft() -> Value {
    json!({
        "destination": "Kyoto",
        "start_date": "2024-10-01",
        "end_date": "2024-10-05",
        "budget_preference": "poor"
    })
}

#[tokio::test]
async fn trip_routes_require_service_key_and_identity() {
    let app = build_app(ApiConfig::default())
        .await
        .expect("app should build");

    let without_key = Request::builder()
        .uri("/v1/trips")
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(without_key).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(trip_request("GET", "/v1/trips", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"], "not_authenticated");
}

#[tokio::test]
async fn trips_are_created_listed_and_planned_per_owner() {
    let app = build_app(ApiConfig::default())
        .await
        .expect("app should build");

    let response = app
        .clone()
        .oneshot(trip_request("POST", "/v1/trips", Some("user-1"), Some(trip_draft())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let trip_id = read_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(trip_request("GET", "/v1/trips", Some("user-1"), None))
        .await
        .unwrap();
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["destination"], "Kyoto");
    assert_eq!(listed[0]["budget_preference"], "poor");

    let trip_uri = format!("/v1/trips/{trip_id}");
    let response = app
        .clone()
        .oneshot(trip_request("GET", &trip_uri, Some("user-2"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let plan_uri = format!("/v1/trips/{trip_id}/plan");
    let response = app
        .clone()
        .oneshot(trip_request(
            "PUT",
            &plan_uri,
            Some("user-1"),
            Some(json!({ "plan": "## Day 1\nFushimi Inari" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["plan"], "## Day 1\nFushimi Inari");

    let response = app
        .clone()
        .oneshot(trip_request("GET", &trip_uri, Some("user-1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["plan"], "## Day 1\nFushimi Inari");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(read_json(response).await["trip_count"], 1);
}

#[tokio::test]
async fn invalid_trip_draft_is_rejected() {
    let app = build_app(ApiConfig::default())
        .await
        .expect("app should build");

    let mut draft = trip_draft();
    draft["end_date"] = json!("2024-09-30");

    let response = app
        .oneshot(trip_request("POST", "/v1/trips", Some("user-1"), Some(draft)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["message"],
        "End date must be after start date"
    );
}
