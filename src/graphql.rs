// GraphQL payloads and response classification

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::AccessToken;

/// One GraphQL operation as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub operation_name: String,
    pub variables: Map<String, Value>,
    pub query: String,
}

impl GraphQlRequest {
    /// Variable through which the API receives the access token
    pub const TOKEN_VARIABLE: &'static str = "token";

    pub fn new(operation_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            variables: Map::new(),
            query: query.into(),
        }
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Put `token` into the variables, replacing any previous one
    pub fn set_token(&mut self, token: &AccessToken) {
        self.variables.insert(
            Self::TOKEN_VARIABLE.to_string(),
            Value::String(token.as_str().to_string()),
        );
    }

    pub fn token(&self) -> Option<&str> {
        self.variables
            .get(Self::TOKEN_VARIABLE)
            .and_then(Value::as_str)
    }
}

/// The API rejected the presented access token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthFailureSignal {
    pub message: Option<String>,
}

impl AuthFailureSignal {
    pub const UNAUTHENTICATED: &'static str = "UNAUTHENTICATED";

    /// Find an error entry classified as unauthenticated
    ///
    /// Other errors (validation, not found, transport) are not auth failures.
    pub fn detect(response: &Value) -> Option<Self> {
        response
            .get("errors")?
            .as_array()?
            .iter()
            .find(|error| {
                error
                    .pointer("/extensions/code")
                    .and_then(Value::as_str)
                    .is_some_and(|code| code == Self::UNAUTHENTICATED)
            })
            .map(|error| AuthFailureSignal {
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
    }
}
