//! HTTP client for the bridge, as used by the chat bot.
//!
//! Transient connection failures (refused, reset, timed out) are retried
//! with a linear back-off. HTTP-level errors are never retried; their
//! envelope is decoded into [`ClientError::Api`].

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::models::{
    ErrorEnvelope, HealthResponse, LinkResponse, PlaceholderResponse, VoteNextResponse,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: u32 = 2;
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The bridge answered with a non-success status.
    #[error("bridge returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("bridge request {method} {path} failed")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("invalid bridge url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct EvalBody<'a> {
    uuid: &'a str,
    placeholders: &'a [String],
}

#[derive(Clone, Debug)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry_delay: Duration,
}

impl BridgeClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.into(),
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // GET /health, sent without credentials
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.send(Method::GET, "/health", &[], false, |req| req).await
    }

    pub async fn resolve_link(&self, discord_id: &str) -> Result<LinkResponse, ClientError> {
        self.send(
            Method::GET,
            "/v1/link/resolve",
            &[("discord_id", discord_id)],
            true,
            |req| req,
        )
        .await
    }

    pub async fn vote_next(&self, uuid: &str) -> Result<VoteNextResponse, ClientError> {
        self.send(Method::GET, "/v1/vote/next", &[("uuid", uuid)], true, |req| req)
            .await
    }

    pub async fn eval_placeholders(
        &self,
        uuid: &str,
        placeholders: &[String],
    ) -> Result<PlaceholderResponse, ClientError> {
        let body = EvalBody { uuid, placeholders };
        self.send(Method::POST, "/v1/placeholders/eval", &[], true, |req| {
            req.json(&body)
        })
        .await
    }

    async fn send<T, F>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        authenticated: bool,
        build: F,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let mut attempt = 0;

        loop {
            let mut req = self.http.request(method.clone(), url.clone());
            if authenticated {
                req = req.bearer_auth(&self.token);
            }

            let outcome = match build(req).send().await {
                Ok(response) => decode(response).await,
                Err(source) => Err(source),
            };

            match outcome {
                Ok(decoded) => return decoded,
                Err(source) if attempt < MAX_RETRIES && is_transient(&source) => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    warn!(
                        method = %method,
                        path,
                        error = %source,
                        delay_ms = delay.as_millis() as u64,
                        "bridge request failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(source) => {
                    return Err(ClientError::Transport {
                        method,
                        path: path.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

// Outer error: transport failure. Inner: the bridge's answer
async fn decode<T: DeserializeOwned>(
    response: Response,
) -> Result<Result<T, ClientError>, reqwest::Error> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map(Ok);
    }

    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.message,
        Err(_) => format!("Bridge returned {}", status.as_u16()),
    };
    Ok(Err(ClientError::Api {
        status: status.as_u16(),
        message,
    }))
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
