/*
[INPUT]:  Request descriptors, credentials, HTTP configuration (timeouts)
[OUTPUT]: Signed HTTP calls and parsed JSON responses
[POS]:    HTTP layer - signed request client
[UPDATE]: When changing headers, signing inputs, or response handling
*/

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Identity};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{Credentials, HmacSigner, rest_timestamp};
use crate::http::endpoints::HEALTH;
use crate::http::{PrimeError, RequestDescriptor, Result};
use crate::notice::emit_licensing_notice;

pub const HEADER_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
pub const HEADER_TIMESTAMP: HeaderName = HeaderName::from_static("x-timestamp");
pub const HEADER_SIGNATURE: HeaderName = HeaderName::from_static("x-signature");

const DEFAULT_PAGE_LIMIT: u32 = 100;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Pagination metadata normalized from a list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// List response with normalized pagination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse {
    pub data: Vec<serde_json::Value>,
    pub pagination: Pagination,
}

/// Signed HTTP client for the Ripple Prime REST API
#[derive(Debug, Clone)]
pub struct PrimeClient {
    http_client: Client,
    base_url: String,
    credentials: Credentials,
    signer: HmacSigner,
}

impl PrimeClient {
    /// Create a new client with default configuration
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(ClientConfig::default(), credentials)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let base_url = credentials.environment.base_url().to_string();
        Self::with_config_and_base_url(config, credentials, &base_url)
    }

    /// Create a client against an explicit base URL
    pub fn with_config_and_base_url(
        config: ClientConfig,
        credentials: Credentials,
        base_url: &str,
    ) -> Result<Self> {
        credentials.validate_for_signing()?;
        let signer = HmacSigner::new(&credentials.api_secret)?;
        emit_licensing_notice();

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if let Some(pem) = credentials.client_identity_pem() {
            let identity = Identity::from_pem(&pem)
                .map_err(|e| PrimeError::signing(format!("invalid mTLS identity: {e}")))?;
            builder = builder.identity(identity);
        }

        let http_client = builder
            .build()
            .map_err(|e| PrimeError::Config(format!("failed to build HTTP client: {e}")))?;

        // validates the URL up front
        url::Url::parse(base_url)?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Compute the signed headers for a request at a given timestamp
    pub fn signed_headers(
        &self,
        request: &RequestDescriptor,
        timestamp: &str,
    ) -> Result<HeaderMap> {
        let body = request.body_string()?;
        let signature = self.signer.sign_request(
            timestamp,
            request.method.as_str(),
            &request.path_with_query(),
            body.as_deref(),
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HEADER_API_KEY, header_value(&self.credentials.api_key)?);
        headers.insert(HEADER_TIMESTAMP, header_value(timestamp)?);
        headers.insert(HEADER_SIGNATURE, header_value(&signature)?);

        if let Some(token) = self.credentials.bearer_token() {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                header_value(&format!("Bearer {token}"))?,
            );
        }

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PrimeError::Config(format!("invalid header name {name}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }

    /// Perform one signed request and return the parsed response body.
    ///
    /// Failures are not retried.
    pub async fn request(&self, request: RequestDescriptor) -> Result<serde_json::Value> {
        let timestamp = rest_timestamp();
        let headers = self.signed_headers(&request, &timestamp)?;
        let path_with_query = request.path_with_query();
        let url = format!("{}{}", self.base_url, path_with_query);

        debug!(method = %request.method, path = %path_with_query, "sending signed request");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = request.body_string()? {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|err| {
            warn!(method = %request.method, path = %path_with_query, error = %err, "request failed");
            PrimeError::from(err)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                method = %request.method,
                path = %path_with_query,
                status = status.as_u16(),
                "request rejected"
            );
            return Err(PrimeError::api_error(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&text).map_err(|err| PrimeError::Transport {
            message: format!("invalid JSON response: {err}"),
            description: Some("Response body could not be parsed".to_string()),
            status: Some(status.as_u16()),
        })
    }

    /// Perform a list request with `limit` applied and normalize its pagination
    pub async fn paginated_request(
        &self,
        request: RequestDescriptor,
        limit: Option<u32>,
    ) -> Result<PaginatedResponse> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let response = self.request(request.set_query("limit", limit)).await?;
        Ok(normalize_page(response, limit))
    }

    /// Credential test: signed GET against the health endpoint
    pub async fn check_credentials(&self) -> Result<serde_json::Value> {
        self.request(RequestDescriptor::get(HEALTH)).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| PrimeError::Config(format!("invalid header value: {e}")))
}

/// Normalize a list response into `{data, pagination}`.
///
/// `data` falls back to the whole response and `total` to the number of items.
pub fn normalize_page(response: serde_json::Value, limit: u32) -> PaginatedResponse {
    let data = match response.get("data") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(value) if !value.is_null() => vec![value.clone()],
        _ => match &response {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Null => Vec::new(),
            other => vec![other.clone()],
        },
    };

    let total = response
        .get("total")
        .and_then(|value| value.as_u64())
        .filter(|total| *total > 0)
        .unwrap_or(data.len() as u64);

    PaginatedResponse {
        pagination: Pagination {
            total,
            limit,
            offset: response.get("offset").and_then(|v| v.as_u64()).unwrap_or(0),
            has_more: response.get("hasMore").and_then(|v| v.as_bool()).unwrap_or(false),
            next_cursor: response
                .get("nextCursor")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        },
        data,
    }
}
