//! Admission pipeline shared by every authenticated route.
//!
//! Order per request: rate check, bearer check, method check, handler.
//! Handler errors surface through [`ApiError`]'s response mapping and
//! panics are turned into the generic 500 envelope by [`panic_response`].

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics::{AUTH_FAILURES_TOTAL, RATE_LIMITED_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::state::AppState;

/// Request bodies longer than this many characters are rejected with `400`.
pub const MAX_BODY_CHARS: usize = 10_000;

// widest UTF-8 encoding of a single character
const MAX_CHAR_BYTES: usize = 4;

// Rate check then bearer check; runs before the handler is dispatched
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&req);

    if state.log_requests {
        info!(method = %req.method(), path = %req.uri().path(), client = %client, "api request");
    }

    if !state.rate_limiter.admit(&client) {
        RATE_LIMITED_TOTAL.inc();
        warn!(client = %client, path = %req.uri().path(), "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    if !bearer_matches(&state, req.headers()) {
        AUTH_FAILURES_TOTAL.inc();
        warn!(client = %client, path = %req.uri().path(), "rejected request: bad bearer token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

fn bearer_matches(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| state.token_matches(token))
}

// Peer IP from the socket; forwarding headers are not trusted
pub fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn require_method(actual: &Method, required: Method) -> Result<(), ApiError> {
    if *actual == required {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

/// Reads the body and enforces [`MAX_BODY_CHARS`].
///
/// The incremental read stops at the byte size the character cap could
/// possibly need. Bodies that are not valid UTF-8 are measured in bytes.
pub async fn read_body(body: Body) -> Result<Vec<u8>, ApiError> {
    let raw = read_body_capped(body, MAX_BODY_CHARS * MAX_CHAR_BYTES).await?;

    let length = match std::str::from_utf8(&raw) {
        Ok(text) => text.chars().count(),
        Err(_) => raw.len(),
    };
    if length > MAX_BODY_CHARS {
        return Err(ApiError::validation("Request body too large"));
    }

    Ok(raw)
}

pub async fn read_body_capped(mut body: Body, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| {
            warn!(error = %e, "failed to read request body");
            ApiError::validation("Failed to read request body")
        })?;

        if let Ok(data) = frame.into_data() {
            if buf.len() + data.len() > limit {
                return Err(ApiError::validation("Request body too large"));
            }
            buf.extend_from_slice(&data);
        }
    }

    Ok(buf)
}

// Outermost layer: count and time every request
pub async fn track_metrics(req: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start = Instant::now();
    let response = next.run(req).await;
    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    response
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    // logged with the detail by ApiError's response mapping
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_at_limit_is_accepted() {
        let body = Body::from(vec![b'a'; 16]);
        let bytes = read_body_capped(body, 16).await.unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[tokio::test]
    async fn body_over_limit_is_rejected() {
        let body = Body::from(vec![b'a'; 17]);
        let err = read_body_capped(body, 16).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Request body too large"));
    }

    #[tokio::test]
    async fn body_cap_counts_characters() {
        // two bytes per character
        let wide = "é".repeat(MAX_BODY_CHARS);
        let bytes = read_body(Body::from(wide.clone())).await.unwrap();
        assert_eq!(bytes.len(), MAX_BODY_CHARS * 2);

        let err = read_body(Body::from(wide + "é")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Request body too large"));
    }

    #[tokio::test]
    async fn invalid_utf8_is_measured_in_bytes() {
        let err = read_body(Body::from(vec![0xff; MAX_BODY_CHARS + 1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Request body too large"));

        let bytes = read_body(Body::from(vec![0xff; MAX_BODY_CHARS])).await.unwrap();
        assert_eq!(bytes.len(), MAX_BODY_CHARS);
    }

    #[test]
    fn method_must_match() {
        assert!(require_method(&Method::GET, Method::GET).is_ok());
        assert!(matches!(
            require_method(&Method::POST, Method::GET),
            Err(ApiError::MethodNotAllowed)
        ));
    }
}
