// HTTP client for the GraphQL API
// Fixed mobile-client headers, one send per call

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{CatalysisError, Result};
use crate::graphql::GraphQlRequest;

/// Petivity GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.petivity.com/graphql";

/// Headers the mobile client sends with every operation
pub const API_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "application/json"),
    ("Accept", "multipart/mixed;deferSpec=20220824, application/json"),
    ("Accept-Encoding", "gzip"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("apollographql-client-name", "com.purina.petivity-apollo-ios"),
    ("apollographql-client-version", "2.9.0-1104"),
    ("X-APOLLO-OPERATION-TYPE", "query"),
    ("User-Agent", "Petivity/1104 CFNetwork/1498.700.2 Darwin/23.6.0"),
];

/// Full header set for one request, in send order
pub fn request_headers(request: &GraphQlRequest) -> Vec<(String, String)> {
    API_HEADERS
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .chain(std::iter::once((
            "X-APOLLO-OPERATION-NAME".to_string(),
            request.operation_name.clone(),
        )))
        .collect()
}

/// Sends one GraphQL payload and returns the parsed response body
#[allow(async_fn_in_trait)]
pub trait ApiTransport {
    async fn send(&self, request: &GraphQlRequest) -> Result<Value>;
}

/// HTTP client for the Petivity GraphQL API
///
/// No retries at this level: a failed send is reported once and the caller decides.
pub struct GraphQlHttpClient {
    client: Client,
    url: String,
}

impl GraphQlHttpClient {
    /// Create a new HTTP client; `None` keeps the transport-default timeouts
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(CatalysisError::from_reqwest)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ApiTransport for GraphQlHttpClient {
    async fn send(&self, request: &GraphQlRequest) -> Result<Value> {
        tracing::debug!(
            url = %self.url,
            operation = %request.operation_name,
            "Sending GraphQL request"
        );

        let body = serde_json::to_vec(request).map_err(anyhow::Error::from)?;

        let mut builder = self.client.post(&self.url);
        for (name, value) in request_headers(request) {
            builder = builder.header(name, value);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(CatalysisError::from_reqwest)?;

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        let text = response.text().await.map_err(CatalysisError::from_reqwest)?;

        // GraphQL servers put error details in JSON bodies even on 4xx/5xx
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => {
                if !status.is_success() {
                    tracing::warn!(
                        status = status.as_u16(),
                        operation = %request.operation_name,
                        "GraphQL request returned an error status"
                    );
                }
                Ok(json)
            }
            Err(e) => {
                // Always print to stderr regardless of log level
                eprintln!(
                    "[HTTP ERROR] status={} url={} response_body={}",
                    status.as_u16(),
                    self.url,
                    text
                );

                tracing::error!(
                    status = status.as_u16(),
                    url = %self.url,
                    error = %e,
                    "GraphQL response is not JSON"
                );

                Err(CatalysisError::InvalidResponse(format!(
                    "{} - {}",
                    status, text
                )))
            }
        }
    }
}
