use axum::{Router, middleware, routing::any};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::gate::{authenticate, not_found, panic_response, track_metrics};
use crate::handlers::{
    eval_placeholders_handler, health_handler, metrics_handler, resolve_link_handler,
    vote_next_handler,
};
use crate::state::AppState;

/// Builds the full route table.
///
/// Routes accept any method so the method check runs after the rate and
/// bearer checks and answers with the JSON envelope.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/v1/link/resolve", any(resolve_link_handler))
        .route("/v1/vote/next", any(vote_next_handler))
        .route("/v1/placeholders/eval", any(eval_placeholders_handler))
        .route("/metrics", any(metrics_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", any(health_handler))
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn(track_metrics))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}
