//! HTTP surface tests driven through the axum router.

mod common;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{
    bad_credentials_page, can_bind_localhost, home_page, mount_login_page, mount_login_response,
    LOGIN_PAGE_PATH,
};
use pesuauth::{
    pesuauth::router,
    portal::{AuthenticationClient, Counter, MetricsCollector, PortalConfig},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn app_for(config: PortalConfig) -> Result<(Router, Arc<MetricsCollector>)> {
    let metrics = Arc::new(MetricsCollector::new());
    let client = Arc::new(AuthenticationClient::new(config, Arc::clone(&metrics)));
    Ok((router(client, "*")?, metrics))
}

fn offline_app() -> Result<(Router, Arc<MetricsCollector>)> {
    // Nothing listens on the discard port; these tests never reach the portal.
    app_for(PortalConfig::for_origin("http://127.0.0.1:9")?)
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_reports_build() -> Result<()> {
    let (app, _) = offline_app()?;
    let response = app.oneshot(get("/health")?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));

    let body = json_body(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn health_options_has_no_body() -> Result<()> {
    let (app, _) = offline_app()?;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/health")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(bytes.is_empty());
    Ok(())
}

#[tokio::test]
async fn detailed_health_reports_reachable_portal() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_login_page(&server, "tok").await;

    let (app, metrics) = app_for(PortalConfig::for_origin(&server.uri())?)?;
    let response = app.oneshot(get("/health/detailed")?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body = json_body(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["pesu_academy"]["status"], "ok");
    assert_eq!(body["pesu_academy"]["status_code"], 200);

    // The probe is not a token fetch and not an authentication.
    for counter in Counter::ALL {
        assert_eq!(metrics.get(counter), 0, "{}", counter.name());
    }
    Ok(())
}

#[tokio::test]
async fn detailed_health_flags_degraded_portal() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOGIN_PAGE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (app, _) = app_for(PortalConfig::for_origin(&server.uri())?)?;
    let response = app.oneshot(get("/health/detailed")?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["pesu_academy"]["status"], "degraded");
    assert_eq!(body["pesu_academy"]["status_code"], 500);
    Ok(())
}

#[tokio::test]
async fn detailed_health_is_unavailable_without_portal() -> Result<()> {
    let (app, _) = offline_app()?;
    let response = app.oneshot(get("/health/detailed")?).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["pesu_academy"]["status"], "error");
    assert!(body["pesu_academy"].get("status_code").is_none());
    Ok(())
}

#[tokio::test]
async fn metrics_lists_every_counter() -> Result<()> {
    let (app, metrics) = offline_app()?;
    metrics.incr(Counter::AuthSuccess);

    let response = app.oneshot(get("/metrics")?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(body["status"], true);
    let counters = body["metrics"].as_object().context("metrics missing")?;
    assert_eq!(counters.len(), Counter::ALL.len());
    assert_eq!(counters["auth_success_total"], 1);
    assert_eq!(counters["csrf_token_refresh_failure_total"], 0);
    Ok(())
}

#[tokio::test]
async fn request_id_is_generated_and_propagated() -> Result<()> {
    let (app, _) = offline_app()?;
    let response = app.clone().oneshot(get("/metrics")?).await?;
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/metrics")
        .header("x-request-id", "req-42")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-42")
    );
    Ok(())
}

#[tokio::test]
async fn readme_redirects_to_repository() -> Result<()> {
    let (app, _) = offline_app()?;
    let response = app.oneshot(get("/readme")?).await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("https://github.com/pesu-dev/auth")
    );
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let (app, _) = offline_app()?;
    let response = app.oneshot(get("/openapi.json")?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert!(body["paths"]["/authenticate"]["post"].is_object());
    Ok(())
}

#[tokio::test]
async fn invalid_requests_are_counted() -> Result<()> {
    let (app, metrics) = offline_app()?;

    let response = app
        .clone()
        .oneshot(post_json(
            "/authenticate",
            &json!({"username": " ", "password": "secret"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["status"], false);
    let message = body["message"].as_str().context("message missing")?;
    assert!(message.starts_with("Could not validate request data - "), "{message}");
    assert!(body["timestamp"].is_string());

    let response = app
        .clone()
        .oneshot(post_json(
            "/authenticate",
            &json!({"username": "u", "password": "p", "fields": ["shoe_size"]}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/authenticate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": "))?;
    let response = app.oneshot(malformed).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(metrics.get(Counter::ValidationError), 3);
    assert_eq!(metrics.get(Counter::CsrfTokenError), 0);
    Ok(())
}

#[tokio::test]
async fn authenticate_maps_outcomes_to_status() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_login_page(&server, "tok").await;
    mount_login_response(
        &server,
        ResponseTemplate::new(200).set_body_string(bad_credentials_page()),
    )
    .await;

    let (app, metrics) = app_for(PortalConfig::for_origin(&server.uri())?)?;
    let response = app
        .oneshot(post_json(
            "/authenticate",
            &json!({"username": "PES1201800001", "password": "wrong"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "Invalid credentials.");
    assert!(body.get("error").is_none());
    assert_eq!(metrics.get(Counter::AuthFailure), 1);
    Ok(())
}

#[tokio::test]
async fn authenticate_success_is_ok() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_login_page(&server, "tok").await;
    mount_login_response(&server, ResponseTemplate::new(200).set_body_string(home_page())).await;

    let (app, _) = app_for(PortalConfig::for_origin(&server.uri())?)?;
    let response = app
        .oneshot(post_json(
            "/authenticate",
            &json!({"username": "PES1201800001", "password": "right"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Login successful.");
    let timestamp = body["timestamp"].as_str().context("timestamp missing")?;
    assert!(timestamp.ends_with("+05:30"), "{timestamp}");
    Ok(())
}

#[tokio::test]
async fn unreachable_portal_is_a_bad_gateway() -> Result<()> {
    let (app, metrics) = offline_app()?;
    let response = app
        .oneshot(post_json(
            "/authenticate",
            &json!({"username": "PES1201800001", "password": "pw"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "csrf_token_error");
    assert_eq!(metrics.get(Counter::CsrfTokenError), 1);
    Ok(())
}
