use axum::{extract::State, http::Method};
use chrono::Utc;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::gate::require_method;
use crate::models::{HealthResponse, Versions, to_iso};
use crate::response::ApiJson;
use crate::state::AppState;

// GET /health - no auth, no rate limit
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
) -> ApiResult<ApiJson<HealthResponse>> {
    require_method(&method, Method::GET)?;

    Ok(ApiJson(HealthResponse {
        ok: true,
        timestamp: to_iso(Utc::now()),
        versions: Versions {
            bridge: env!("CARGO_PKG_VERSION").to_string(),
            server: state.server_version.clone(),
        },
        integrations: state.providers.integrations(),
    }))
}
