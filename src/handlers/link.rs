use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::Method,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::gate::require_method;
use crate::models::{LinkResponse, LinkResult};
use crate::response::ApiJson;
use crate::state::AppState;
use crate::validate::is_valid_discord_id;

#[derive(Deserialize)]
pub struct LinkQuery {
    discord_id: Option<String>,
}

// GET /v1/link/resolve?discord_id=...
pub async fn resolve_link_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    query: Result<Query<LinkQuery>, QueryRejection>,
) -> ApiResult<ApiJson<LinkResponse>> {
    require_method(&method, Method::GET)?;

    let Query(query) = query.map_err(|_| ApiError::validation("Invalid query string"))?;
    let discord_id = query
        .discord_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required parameter: discord_id"))?;

    if !is_valid_discord_id(&discord_id) {
        return Err(ApiError::validation("Invalid discord_id format"));
    }

    let links = &state.providers.links;
    if !links.is_available() {
        return Err(ApiError::ProviderUnavailable("DiscordSRV integration unavailable"));
    }

    let lookup = state
        .link_cache
        .get_or_compute(discord_id.clone(), || links.resolve_link(&discord_id));

    let response = match lookup {
        Ok(result) => LinkResponse {
            result,
            error: None,
        },
        // failures are reported as unlinked and never cached
        Err(e) => {
            warn!(discord_id = %discord_id, error = %e, "link lookup failed");
            LinkResponse {
                result: LinkResult::unlinked(),
                error: Some("Failed to query DiscordSRV".to_string()),
            }
        }
    };

    Ok(ApiJson(response))
}
