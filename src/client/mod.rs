//! HTTP client for the quotes API
//!
//! Every call is async and bounded by the configured request timeout, so a
//! caller driving a user interface can await it without freezing.

use crate::config::ClientConfig;
use crate::storage::{NewQuote, QuoteRecord};
use reqwest::{Client, Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the quotes API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed: refused connection, timeout, reset
    #[error("Cannot reach quotes API: {0}")]
    Connectivity(String),

    #[error("Quote {0} not found")]
    NotFound(i64),

    #[error("API returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether trying the same call again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

/// Result type for client calls
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Typed client for the quotes API
#[derive(Debug, Clone)]
pub struct QuoteClient {
    http: Client,
    base_url: String,
}

impl QuoteClient {
    /// Builds a client for the API at `base_url`
    pub fn new(base_url: &str, request_timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(
            &config.api_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_quotes(&self) -> ClientResult<Vec<QuoteRecord>> {
        let response = self.http.get(self.url("/quotes")).send().await?;
        decode(response, None).await
    }

    pub async fn get_quote(&self, id: i64) -> ClientResult<QuoteRecord> {
        let response = self
            .http
            .get(self.url(&format!("/quotes/{}", id)))
            .send()
            .await?;
        decode(response, Some(id)).await
    }

    pub async fn create_quote(&self, quote: &NewQuote) -> ClientResult<QuoteRecord> {
        let response = self
            .http
            .post(self.url("/quotes"))
            .json(quote)
            .send()
            .await?;
        decode(response, None).await
    }

    pub async fn update_quote(&self, id: i64, quote: &NewQuote) -> ClientResult<QuoteRecord> {
        let response = self
            .http
            .put(self.url(&format!("/quotes/{}", id)))
            .json(quote)
            .send()
            .await?;
        decode(response, Some(id)).await
    }

    pub async fn delete_quote(&self, id: i64) -> ClientResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/quotes/{}", id)))
            .send()
            .await?;
        decode::<IgnoredAny>(response, Some(id)).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps a response to its body or a `ClientError`
///
/// `id` is the quote addressed by the request, used to report 404s.
async fn decode<T: DeserializeOwned>(response: Response, id: Option<i64>) -> ClientResult<T> {
    let status = response.status();

    if status.is_success() {
        let body = response.bytes().await?;
        return serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()));
    }

    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(ClientError::NotFound(id));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or(body);

    tracing::debug!("API responded {} ({})", status, detail);

    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}
