//! Health check endpoint.

use actix_web::{HttpResponse, web};
use quill_shared::HealthResponse;

use crate::state::AppState;

/// GET /health
///
/// Reports `degraded` when the configured database stops answering.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = state.storage.ping().await;

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage.name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
