use axum::{body::Body, extract::State, http::Method};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::gate::{read_body, require_method};
use crate::models::PlaceholderResponse;
use crate::providers::{PlaceholderEvaluator, ProviderError};
use crate::response::ApiJson;
use crate::state::AppState;
use crate::validate::{ERROR, MAX_PLACEHOLDERS, TokenCheck, check_placeholder, is_valid_uuid};

const EVALUATOR_GONE: &str = "PlaceholderAPI not available";

// Validated body of POST /v1/placeholders/eval
#[derive(Debug)]
struct EvalRequest {
    uuid: String,
    placeholders: Vec<String>,
}

impl EvalRequest {
    fn parse(raw: &[u8]) -> Result<Self, ApiError> {
        let Ok(Value::Object(mut body)) = serde_json::from_slice::<Value>(raw) else {
            return Err(ApiError::validation("Invalid JSON body"));
        };

        let uuid = match body.remove("uuid") {
            None | Some(Value::Null) => {
                return Err(ApiError::validation("Missing required field: uuid"));
            }
            Some(Value::String(uuid)) if is_valid_uuid(&uuid) => uuid,
            Some(_) => return Err(ApiError::validation("Invalid uuid format")),
        };

        let Some(Value::Array(items)) = body.remove("placeholders") else {
            return Err(ApiError::validation(
                "Missing required field: placeholders (array)",
            ));
        };
        if items.is_empty() {
            return Err(ApiError::validation("Placeholders array is empty"));
        }
        if items.len() > MAX_PLACEHOLDERS {
            return Err(ApiError::validation(format!(
                "Too many placeholders (max {MAX_PLACEHOLDERS})"
            )));
        }

        let placeholders = items
            .into_iter()
            .map(|item| match item {
                Value::String(token) => Ok(token),
                _ => Err(ApiError::validation("Placeholders must be strings")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { uuid, placeholders })
    }
}

// POST /v1/placeholders/eval
pub async fn eval_placeholders_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Body,
) -> ApiResult<ApiJson<PlaceholderResponse>> {
    require_method(&method, Method::POST)?;

    let raw = read_body(body).await?;
    let request = EvalRequest::parse(&raw)?;

    let evaluator = state.providers.placeholders.as_ref();
    if !evaluator.is_available() {
        return Err(ApiError::ProviderUnavailable("PlaceholderAPI integration unavailable"));
    }

    let values = evaluate(evaluator, &request.uuid, &request.placeholders);

    Ok(ApiJson(PlaceholderResponse {
        uuid: request.uuid,
        values,
    }))
}

/// Resolves each token in request order. Tokens failing the format check
/// or the denylist never reach the evaluator.
fn evaluate(
    evaluator: &dyn PlaceholderEvaluator,
    uuid: &str,
    tokens: &[String],
) -> Map<String, Value> {
    let checks: Vec<TokenCheck> = tokens.iter().map(|token| check_placeholder(token)).collect();
    let evaluable: Vec<String> = tokens
        .iter()
        .zip(&checks)
        .filter(|(_, check)| **check == TokenCheck::Evaluate)
        .map(|(token, _)| token.clone())
        .collect();

    let resolved = if evaluable.is_empty() {
        Ok(HashMap::new())
    } else {
        evaluator.evaluate(uuid, &evaluable)
    };

    let fallback = match &resolved {
        Ok(_) => ERROR,
        Err(ProviderError::Unavailable) => {
            warn!(uuid = %uuid, "placeholder evaluator became unavailable mid-request");
            EVALUATOR_GONE
        }
        Err(e) => {
            warn!(uuid = %uuid, error = %e, "placeholder evaluation failed");
            ERROR
        }
    };

    let mut values = Map::new();
    for (token, check) in tokens.iter().zip(checks) {
        let value = match check.sentinel() {
            Some(sentinel) => sentinel.to_string(),
            None => resolved
                .as_ref()
                .ok()
                .and_then(|resolved| resolved.get(token).cloned())
                .unwrap_or_else(|| fallback.to_string()),
        };
        values.insert(token.clone(), Value::String(value));
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryPlaceholders;
    use crate::validate::{BLOCKED, INVALID_FORMAT};

    const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    struct Failing(ProviderError);

    impl PlaceholderEvaluator for Failing {
        fn is_available(&self) -> bool {
            true
        }

        fn evaluate(
            &self,
            _: &str,
            _: &[String],
        ) -> Result<HashMap<String, String>, ProviderError> {
            Err(match &self.0 {
                ProviderError::Unavailable => ProviderError::Unavailable,
                ProviderError::Lookup(m) => ProviderError::Lookup(m.clone()),
            })
        }
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn sentinels_replace_rejected_tokens() {
        let evaluator = MemoryPlaceholders::new();
        evaluator.set(UUID, "%player_name%", "Steve");

        let values = evaluate(
            &evaluator,
            UUID,
            &tokens(&["%player_name%", "%javascript_eval%", "%bad format%"]),
        );

        let ordered: Vec<(&str, &str)> = values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().unwrap()))
            .collect();
        assert_eq!(
            ordered,
            vec![
                ("%player_name%", "Steve"),
                ("%javascript_eval%", BLOCKED),
                ("%bad format%", INVALID_FORMAT),
            ]
        );
    }

    #[test]
    fn evaluator_failure_marks_tokens_as_error() {
        let evaluator = Failing(ProviderError::Lookup("player data locked".into()));
        let values = evaluate(&evaluator, UUID, &tokens(&["%a%", "%math_1%"]));
        assert_eq!(values["%a%"], ERROR);
        assert_eq!(values["%math_1%"], BLOCKED);
    }

    #[test]
    fn evaluator_going_away_reports_availability() {
        let evaluator = Failing(ProviderError::Unavailable);
        let values = evaluate(&evaluator, UUID, &tokens(&["%a%"]));
        assert_eq!(values["%a%"], EVALUATOR_GONE);
    }

    #[test]
    fn request_parsing_checks_fields_in_order() {
        let err = |raw: &str| match EvalRequest::parse(raw.as_bytes()) {
            Err(ApiError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        };

        assert_eq!(err("not json"), "Invalid JSON body");
        assert_eq!(err("[1, 2]"), "Invalid JSON body");
        assert_eq!(err(r#"{"placeholders": ["%a%"]}"#), "Missing required field: uuid");
        assert_eq!(err(r#"{"uuid": "abc", "placeholders": ["%a%"]}"#), "Invalid uuid format");
        assert_eq!(
            err(&format!(r#"{{"uuid": "{UUID}"}}"#)),
            "Missing required field: placeholders (array)"
        );
        assert_eq!(
            err(&format!(r#"{{"uuid": "{UUID}", "placeholders": []}}"#)),
            "Placeholders array is empty"
        );
        assert_eq!(
            err(&format!(r#"{{"uuid": "{UUID}", "placeholders": [1]}}"#)),
            "Placeholders must be strings"
        );
    }
}
