// In-memory collaborators for unit tests

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::auth::{AccessToken, IdentityProvider, InitiateAuthRequest};
use crate::error::{CatalysisError, Result};
use crate::graphql::GraphQlRequest;
use crate::http_client::ApiTransport;

/// Signed-looking token whose `exp` is `secs` from now
pub fn token_expiring_in(secs: i64) -> AccessToken {
    token_with_claims(json!({
        "sub": "4f1c2b7e-0000-4000-8000-000000000000",
        "token_use": "access",
        "exp": chrono::Utc::now().timestamp() + secs,
    }))
}

pub fn token_with_claims(claims: Value) -> AccessToken {
    let header = URL_SAFE_NO_PAD.encode(br#"{"kid":"test-key","alg":"RS256"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signature = URL_SAFE_NO_PAD.encode([7u8; 64]);
    AccessToken::new(format!("{}.{}.{}", header, payload, signature))
}

/// Successful InitiateAuth body carrying `token`
pub fn renewal_response(token: &AccessToken) -> Value {
    json!({
        "AuthenticationResult": {
            "AccessToken": token.as_str(),
            "ExpiresIn": 3600,
            "TokenType": "Bearer"
        },
        "ChallengeParameters": {}
    })
}

pub fn unauthenticated_response() -> Value {
    json!({
        "data": null,
        "errors": [{ "message": "Unauthorized", "extensions": { "code": "UNAUTHENTICATED" } }]
    })
}

fn exhausted() -> CatalysisError {
    CatalysisError::Transport {
        kind: "unknown",
        message: "no scripted response left".to_string(),
    }
}

/// Identity provider replaying scripted responses
pub struct FakeProvider {
    responses: RefCell<VecDeque<Result<Value>>>,
    requests: RefCell<Vec<InitiateAuthRequest>>,
}

impl FakeProvider {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<InitiateAuthRequest> {
        self.requests.borrow().clone()
    }
}

impl IdentityProvider for FakeProvider {
    async fn initiate_auth(&self, request: &InitiateAuthRequest) -> Result<Value> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(exhausted()))
    }
}

/// GraphQL transport replaying scripted responses
pub struct FakeTransport {
    responses: RefCell<VecDeque<Result<Value>>>,
    requests: RefCell<Vec<GraphQlRequest>>,
}

impl FakeTransport {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.borrow().clone()
    }
}

impl ApiTransport for FakeTransport {
    async fn send(&self, request: &GraphQlRequest) -> Result<Value> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(exhausted()))
    }
}
