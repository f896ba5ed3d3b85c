use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::Method,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::gate::require_method;
use crate::models::VoteNextResponse;
use crate::response::ApiJson;
use crate::state::AppState;
use crate::validate::is_valid_uuid;

#[derive(Deserialize)]
pub struct VoteQuery {
    uuid: Option<String>,
}

// GET /v1/vote/next?uuid=...
pub async fn vote_next_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    query: Result<Query<VoteQuery>, QueryRejection>,
) -> ApiResult<ApiJson<VoteNextResponse>> {
    require_method(&method, Method::GET)?;

    let Query(query) = query.map_err(|_| ApiError::validation("Invalid query string"))?;
    let uuid = query
        .uuid
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required parameter: uuid"))?;

    if !is_valid_uuid(&uuid) {
        return Err(ApiError::validation("Invalid uuid format"));
    }

    let votes = &state.providers.votes;
    if !votes.is_available() {
        return Err(ApiError::ProviderUnavailable("VotingPlugin integration unavailable"));
    }

    let sites = state
        .vote_cache
        .get_or_compute(uuid.clone(), || votes.vote_status(&uuid))
        .unwrap_or_else(|e| {
            warn!(uuid = %uuid, error = %e, "vote status lookup failed");
            Vec::new()
        });

    Ok(ApiJson(VoteNextResponse {
        uuid,
        sites,
        queried_at: Utc::now().timestamp(),
    }))
}
