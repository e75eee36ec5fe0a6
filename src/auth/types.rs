// Authentication types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential presented to the GraphQL API
///
/// Compact-encoded as three dot-separated segments; the middle one carries the claims.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form safe for diagnostics
    pub fn preview(&self) -> String {
        preview(&self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.preview()).finish()
    }
}

/// Render a secret as its first and last 20 characters
///
/// Secrets too short to truncate meaningfully are replaced entirely.
pub fn preview(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 40 {
        return format!("<redacted {} chars>", chars.len());
    }
    let head: String = chars[..20].iter().collect();
    let tail: String = chars[chars.len() - 20..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Claims carried by the access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Absolute expiration, seconds since epoch
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
}

/// Credential set supplied by the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub access_token: Option<AccessToken>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub const ACCESS_TOKEN_VAR: &'static str = "PETIVITY_JWT";
    pub const CLIENT_ID_VAR: &'static str = "PETIVITY_CLIENT_ID";
    pub const REFRESH_TOKEN_VAR: &'static str = "PETIVITY_REFRESH_TOKEN";

    /// Load credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary lookup; empty values count as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            access_token: read(Self::ACCESS_TOKEN_VAR).map(AccessToken::new),
            client_id: read(Self::CLIENT_ID_VAR),
            refresh_token: read(Self::REFRESH_TOKEN_VAR),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token)
            .field("client_id", &self.client_id)
            .field("refresh_token", &self.refresh_token.as_deref().map(preview))
            .finish()
    }
}

/// Cognito InitiateAuth request for the refresh-token flow
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthRequest {
    pub client_id: String,
    pub auth_flow: &'static str,
    pub auth_parameters: AuthParameters,
}

impl InitiateAuthRequest {
    pub const REFRESH_TOKEN_AUTH: &'static str = "REFRESH_TOKEN_AUTH";

    pub fn refresh(client_id: &str, refresh_token: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            auth_flow: Self::REFRESH_TOKEN_AUTH,
            auth_parameters: AuthParameters {
                refresh_token: refresh_token.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthParameters {
    #[serde(rename = "REFRESH_TOKEN")]
    pub refresh_token: String,
}

/// Cognito InitiateAuth response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthResponse {
    #[serde(default)]
    pub authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
