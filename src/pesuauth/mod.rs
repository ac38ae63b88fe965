#![allow(clippy::needless_for_each)]

use crate::{
    pesuauth::handlers::{
        authenticate, authenticate::__path_authenticate, health, health::__path_health,
        health::__path_health_detailed, health_detailed, metrics, metrics::__path_metrics, readme,
        readme::__path_readme,
    },
    portal::{AuthResult, AuthenticationClient, ErrorKind, ProfileData, ProfileField},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(authenticate, metrics, health, health_detailed, readme),
    components(schemas(
        authenticate::AuthenticateRequest,
        authenticate::ValidationFailure,
        health::Health,
        health::DetailedHealth,
        health::PortalCheck,
        AuthResult,
        ProfileData,
        ProfileField,
        ErrorKind
    )),
    tags(
        (name = "authentication", description = "Authenticate against PESU Academy"),
        (name = "monitoring", description = "Service counters"),
        (name = "health", description = "Liveness and PESU Academy reachability"),
        (name = "documentation", description = "Project documentation")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

fn cors(allow_origin: &str) -> Result<CorsLayer> {
    let allow_origin = allow_origin.trim();
    let origin = if allow_origin == "*" {
        AllowOrigin::any()
    } else {
        let origins = allow_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(origin))
}

/// Build the application router.
///
/// # Errors
/// Returns an error if the CORS origin is not a valid header value.
pub fn router(client: Arc<AuthenticationClient>, cors_allow_origin: &str) -> Result<Router> {
    let app = Router::new()
        .route("/authenticate", post(handlers::authenticate))
        .route("/metrics", get(handlers::metrics))
        .route("/readme", get(handlers::readme))
        .route("/openapi.json", get(handlers::openapi))
        .route("/health/detailed", get(handlers::health_detailed))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors(cors_allow_origin)?)
                .layer(Extension(client)),
        )
        .route("/health", get(handlers::health).options(handlers::health));

    Ok(app)
}

/// Start the server and serve until Ctrl-C or SIGTERM.
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    host: &str,
    port: u16,
    client: Arc<AuthenticationClient>,
    cors_allow_origin: &str,
) -> Result<()> {
    let app = router(client, cors_allow_origin)?;

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;

    let local_addr: SocketAddr = listener.local_addr()?;

    info!("Listening on {}", local_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
