use crate::portal::{types::portal_now, AuthenticationClient, MetricsReport};
use axum::{extract::Extension, response::Json};
use std::sync::Arc;

#[utoipa::path(
    get,
    path= "/metrics",
    responses (
        (status = 200, description = "Current value of every counter", content_type = "application/json")
    ),
    tag= "monitoring"
)]
pub async fn metrics(client: Extension<Arc<AuthenticationClient>>) -> Json<MetricsReport> {
    Json(MetricsReport {
        status: true,
        message: "Metrics retrieved successfully".to_string(),
        timestamp: portal_now().to_rfc3339(),
        metrics: client.metrics().snapshot(),
    })
}
