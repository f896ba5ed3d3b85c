use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// Used when a body fails to serialize; must stay valid JSON on its own
const SERIALIZE_FAILURE: &str =
    r#"{"error":true,"status":500,"message":"Internal server error"}"#;

/// JSON body sent with an explicit `charset=utf-8` content type.
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                bytes,
            )
                .into_response(),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                    SERIALIZE_FAILURE,
                )
                    .into_response()
            }
        }
    }
}
