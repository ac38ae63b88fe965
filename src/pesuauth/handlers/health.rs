use crate::{
    portal::{http::PortalClient, AuthenticationClient},
    GIT_COMMIT_HASH,
};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    status: String,
    commit: String,
    name: String,
    version: String,
}

impl Health {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// `name:version:short-hash`, sent as `X-App`.
    fn x_app(&self) -> HeaderMap {
        let short_hash = self.commit.get(0..7).unwrap_or_default();

        format!("{}:{}:{}", self.name, self.version, short_hash)
            .parse::<HeaderValue>()
            .map(|x_app_header_value| {
                debug!("X-App header: {:?}", x_app_header_value);

                let mut headers = HeaderMap::new();
                headers.insert("X-App", x_app_header_value);
                headers
            })
            .unwrap_or_else(|err| {
                error!("Failed to parse X-App header: {}", err);
                HeaderMap::new()
            })
    }
}

/// Reachability of the PESU Academy portal.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PortalCheck {
    /// `ok`, `degraded` (reachable, non-2xx) or `error` (unreachable).
    status: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DetailedHealth {
    #[serde(flatten)]
    build: Health,
    pesu_academy: PortalCheck,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Service is up", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method) -> impl IntoResponse {
    let health = Health::new("ok");
    let headers = health.x_app();

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    (StatusCode::OK, headers, body)
}

async fn check_portal(portal: &PortalClient) -> PortalCheck {
    let started = Instant::now();
    let result = portal.probe().await;
    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(status) if status.is_success() => PortalCheck {
            status: "ok".to_string(),
            message: "PESU Academy is accessible".to_string(),
            response_time_ms: Some(elapsed),
            status_code: Some(status.as_u16()),
        },
        Ok(status) => {
            warn!(%status, "PESU Academy health probe got an unexpected status");
            PortalCheck {
                status: "degraded".to_string(),
                message: format!("PESU Academy returned status {status}"),
                response_time_ms: Some(elapsed),
                status_code: Some(status.as_u16()),
            }
        }
        Err(e) => {
            error!("PESU Academy health probe failed: {}", e);
            PortalCheck {
                status: "error".to_string(),
                message: format!("PESU Academy connection failed: {e}"),
                response_time_ms: None,
                status_code: None,
            }
        }
    }
}

#[utoipa::path(
    get,
    path= "/health/detailed",
    responses (
        (status = 200, description = "PESU Academy is reachable (possibly degraded)", body = [DetailedHealth]),
        (status = 503, description = "PESU Academy is unreachable", body = [DetailedHealth])
    ),
    tag= "health"
)]
// axum handler for health with the upstream portal check
pub async fn health_detailed(
    Extension(client): Extension<Arc<AuthenticationClient>>,
) -> impl IntoResponse {
    let pesu_academy = check_portal(client.portal()).await;

    let (status, is_healthy) = match pesu_academy.status.as_str() {
        "ok" => ("ok", true),
        "degraded" => ("degraded", true),
        _ => ("unhealthy", false),
    };

    let health = DetailedHealth {
        build: Health::new(status),
        pesu_academy,
    };
    let headers = health.build.x_app();

    if is_healthy {
        debug!(status, "PESU Academy is reachable");
        (StatusCode::OK, headers, Json(health))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, Json(health))
    }
}
