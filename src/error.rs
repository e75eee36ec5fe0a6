// Error handling module
// Defines the error taxonomy and its mapping to process exit codes

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a command
#[derive(Error, Debug)]
pub enum CatalysisError {
    /// Required environment input is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Query document could not be found on disk
    #[error("Query document not found: {}", .0.display())]
    QueryDocumentMissing(PathBuf),

    /// Renewal attempted without the named credential
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// Identity provider answered without a usable access token
    #[error("Token renewal rejected: {0}")]
    RenewalRejected(String),

    /// Pre-flight renewal failed, the operation was aborted
    #[error("Token refresh failed: {0}")]
    RefreshFailed(Box<CatalysisError>),

    /// Network-level failure talking to a remote endpoint
    #[error("HTTP request failed: {message} (kind: {kind})")]
    Transport { kind: &'static str, message: String },

    /// Remote endpoint answered with something that is not JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CatalysisError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CatalysisError::Configuration(_) => 2,
            CatalysisError::QueryDocumentMissing(_) => 3,
            CatalysisError::MissingCredential(_)
            | CatalysisError::RenewalRejected(_)
            | CatalysisError::RefreshFailed(_) => 4,
            CatalysisError::Transport { .. } | CatalysisError::InvalidResponse(_) => 5,
            CatalysisError::Internal(_) => 1,
        }
    }

    /// Classify a reqwest failure for diagnostics
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connection_failed"
        } else if err.is_request() {
            "request_error"
        } else if err.is_body() {
            "body_error"
        } else if err.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        tracing::warn!(
            error_kind = kind,
            error_debug = ?err,
            "HTTP request error"
        );

        CatalysisError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

/// Result type alias for catalysis operations
pub type Result<T> = std::result::Result<T, CatalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CatalysisError::Configuration("PETIVITY_JWT is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: PETIVITY_JWT is required"
        );

        let err = CatalysisError::MissingCredential("PETIVITY_REFRESH_TOKEN");
        assert_eq!(
            err.to_string(),
            "Missing credential: PETIVITY_REFRESH_TOKEN is not set"
        );

        let err = CatalysisError::QueryDocumentMissing(PathBuf::from("queries/status.graphql"));
        assert_eq!(
            err.to_string(),
            "Query document not found: queries/status.graphql"
        );
    }

    #[test]
    fn test_refresh_failed_wraps_cause() {
        let err = CatalysisError::RefreshFailed(Box::new(CatalysisError::RenewalRejected(
            r#"{"__type":"NotAuthorizedException"}"#.to_string(),
        )));
        assert!(err.to_string().starts_with("Token refresh failed: Token renewal rejected"));
        assert!(err.to_string().contains("NotAuthorizedException"));
    }

    #[test]
    fn test_transport_error_message() {
        let err = CatalysisError::Transport {
            kind: "timeout",
            message: "operation timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP request failed: operation timed out (kind: timeout)"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CatalysisError::Configuration(String::new()).exit_code(), 2);
        assert_eq!(
            CatalysisError::QueryDocumentMissing(PathBuf::new()).exit_code(),
            3
        );
        assert_eq!(CatalysisError::MissingCredential("X").exit_code(), 4);
        assert_eq!(CatalysisError::RenewalRejected(String::new()).exit_code(), 4);
        assert_eq!(
            CatalysisError::RefreshFailed(Box::new(CatalysisError::MissingCredential("X")))
                .exit_code(),
            4
        );
        assert_eq!(
            CatalysisError::Transport {
                kind: "unknown",
                message: String::new()
            }
            .exit_code(),
            5
        );
        assert_eq!(CatalysisError::InvalidResponse(String::new()).exit_code(), 5);
        assert_eq!(
            CatalysisError::Internal(anyhow::anyhow!("boom")).exit_code(),
            1
        );
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err: CatalysisError = anyhow::anyhow!("Something went wrong").into();
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }
}
