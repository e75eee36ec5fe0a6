// Token refresh logic

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::types::{AccessToken, Credentials, InitiateAuthRequest, InitiateAuthResponse};
use crate::error::{CatalysisError, Result};

/// Regional Cognito identity-provider endpoint
pub const DEFAULT_IDP_URL: &str = "https://cognito-idp.us-east-1.amazonaws.com/";

/// Operation selector for the Cognito JSON protocol
pub const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

/// Content type of the Cognito JSON protocol
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Exchanges a refresh credential for a new access token
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Send one InitiateAuth request and return the raw response body
    async fn initiate_auth(&self, request: &InitiateAuthRequest) -> Result<Value>;
}

/// Cognito identity provider over HTTPS
pub struct CognitoClient {
    client: Client,
    url: String,
}

impl CognitoClient {
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

impl IdentityProvider for CognitoClient {
    async fn initiate_auth(&self, request: &InitiateAuthRequest) -> Result<Value> {
        tracing::debug!(
            url = %self.url,
            client_id = %request.client_id,
            "Sending InitiateAuth refresh request"
        );

        let body = serde_json::to_vec(request).map_err(anyhow::Error::from)?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .body(body)
            .send()
            .await
            .map_err(CatalysisError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(CatalysisError::from_reqwest)?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body = %text,
                "InitiateAuth refresh failed"
            );
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(json) => Ok(json),
            Err(_) if !status.is_success() => Err(CatalysisError::RenewalRejected(format!(
                "{} - {}",
                status, text
            ))),
            Err(e) => Err(CatalysisError::InvalidResponse(format!(
                "InitiateAuth response is not JSON: {}",
                e
            ))),
        }
    }
}

/// Renews the access token from the environment's refresh credential
///
/// Performs exactly one exchange per call; callers decide whether to retry.
pub struct TokenRenewer<P> {
    provider: P,
    client_id: Option<String>,
    refresh_token: Option<String>,
}

impl<P: IdentityProvider> TokenRenewer<P> {
    pub fn new(provider: P, credentials: &Credentials) -> Self {
        Self {
            provider,
            client_id: credentials.client_id.clone(),
            refresh_token: credentials.refresh_token.clone(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build the InitiateAuth request, failing before any network call if a credential is absent
    pub fn request(&self) -> Result<InitiateAuthRequest> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(CatalysisError::MissingCredential(
                Credentials::REFRESH_TOKEN_VAR,
            ))?;
        let client_id = self
            .client_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(CatalysisError::MissingCredential(Credentials::CLIENT_ID_VAR))?;

        Ok(InitiateAuthRequest::refresh(client_id, refresh_token))
    }

    /// Exchange the refresh credential for a new access token
    pub async fn renew(&self) -> Result<AccessToken> {
        let request = self.request()?;

        tracing::info!("Refreshing access token via InitiateAuth...");
        let raw = self.provider.initiate_auth(&request).await?;

        match extract_access_token(&raw) {
            Some(token) => {
                tracing::info!("Token refreshed: {}", token.preview());
                Ok(token)
            }
            None => {
                // Always surface the provider's answer regardless of log level
                eprintln!("[REFRESH ERROR] identity provider response: {}", raw);
                tracing::error!(response = %raw, "Refresh response has no access token");
                Err(CatalysisError::RenewalRejected(raw.to_string()))
            }
        }
    }
}

/// Pull `AuthenticationResult.AccessToken` out of a raw response
fn extract_access_token(raw: &Value) -> Option<AccessToken> {
    let parsed: InitiateAuthResponse = serde_json::from_value(raw.clone()).ok()?;
    parsed
        .authentication_result?
        .access_token
        .filter(|t| !t.trim().is_empty())
        .map(AccessToken::new)
}
