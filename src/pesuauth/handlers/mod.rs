pub mod health;
pub use self::health::{health, health_detailed};

pub mod authenticate;
pub use self::authenticate::authenticate;

pub mod metrics;
pub use self::metrics::metrics;

pub mod readme;
pub use self::readme::readme;

use axum::response::Json;

// axum handler for the generated OpenAPI document
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(super::openapi())
}
