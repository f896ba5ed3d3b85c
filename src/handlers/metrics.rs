use axum::{
    http::{HeaderValue, Method, header},
    response::IntoResponse,
};
use prometheus::{Encoder, TextEncoder};

use crate::error::{ApiError, ApiResult};
use crate::gate::require_method;

// GET /metrics - Prometheus text, behind the same gate as /v1
pub async fn metrics_handler(method: Method) -> ApiResult<impl IntoResponse> {
    require_method(&method, Method::GET)?;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))?;

    let content_type = HeaderValue::from_str(encoder.format_type())
        .map_err(|e| ApiError::Internal(format!("bad metrics content type: {e}")))?;

    Ok(([(header::CONTENT_TYPE, content_type)], buffer))
}
