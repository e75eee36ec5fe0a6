// Token expiry inspection

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{AccessToken, Claims};

/// Seconds before expiry at which a token is renewed proactively
pub const RENEWAL_BUFFER_SECS: i64 = 300;

/// Why the claims segment could not be read
#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("expected 3 dot-separated segments, found {0}")]
    Malformed(usize),

    #[error("claims segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("claims segment is not a valid claims object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("exp claim {0} is out of range")]
    ExpOutOfRange(i64),
}

/// Freshness of an access token relative to the renewal buffer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenStatus {
    /// At least `RENEWAL_BUFFER_SECS` left
    Fresh {
        expires_at: DateTime<Utc>,
        seconds_remaining: i64,
    },

    /// Expired, or expiring inside the buffer. Negative offset means not yet expired.
    Stale {
        expires_at: DateTime<Utc>,
        seconds_since_expiry: i64,
    },

    /// Claims could not be decoded; treated as fresh
    Unparseable { reason: String },
}

impl TokenStatus {
    pub fn needs_renewal(&self) -> bool {
        matches!(self, TokenStatus::Stale { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenStatus::Fresh { .. } => "fresh",
            TokenStatus::Stale { .. } => "stale",
            TokenStatus::Unparseable { .. } => "unparseable",
        }
    }

    /// Human-readable status line
    pub fn describe(&self) -> String {
        match self {
            TokenStatus::Fresh {
                expires_at,
                seconds_remaining,
            } => format!(
                "Token expires at {} ({}s remaining)",
                expires_at.to_rfc3339(),
                seconds_remaining
            ),
            TokenStatus::Stale {
                expires_at,
                seconds_since_expiry,
            } if *seconds_since_expiry >= 0 => format!(
                "Token expired at {} ({}s ago)",
                expires_at.to_rfc3339(),
                seconds_since_expiry
            ),
            TokenStatus::Stale {
                expires_at,
                seconds_since_expiry,
            } => format!(
                "Token expires at {} ({}s remaining, inside the {}s renewal window)",
                expires_at.to_rfc3339(),
                -seconds_since_expiry,
                RENEWAL_BUFFER_SECS
            ),
            TokenStatus::Unparseable { reason } => format!(
                "Could not determine token expiry ({}), assuming it is still valid",
                reason
            ),
        }
    }
}

/// Decode the claims segment of a compact-encoded token
pub fn decode_claims(token: &AccessToken) -> Result<Claims, ClaimsError> {
    let segments: Vec<&str> = token.as_str().split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::Malformed(segments.len()));
    }

    let bytes = URL_SAFE.decode(pad_segment(segments[1]))?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

/// Restore the `=` padding that compact encoding strips
fn pad_segment(segment: &str) -> String {
    let mut padded = segment.trim_end_matches('=').to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

/// Classify a token against `now` without logging
pub fn inspect_at(token: &AccessToken, now: DateTime<Utc>) -> TokenStatus {
    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            return TokenStatus::Unparseable {
                reason: e.to_string(),
            }
        }
    };

    let Some(expires_at) = DateTime::from_timestamp(claims.exp, 0) else {
        return TokenStatus::Unparseable {
            reason: ClaimsError::ExpOutOfRange(claims.exp).to_string(),
        };
    };

    let remaining = claims.exp - now.timestamp();
    if remaining >= RENEWAL_BUFFER_SECS {
        TokenStatus::Fresh {
            expires_at,
            seconds_remaining: remaining,
        }
    } else {
        TokenStatus::Stale {
            expires_at,
            seconds_since_expiry: -remaining,
        }
    }
}

/// Classify a token against the current time and report the result on the diagnostic channel
pub fn inspect(token: &AccessToken) -> TokenStatus {
    let status = inspect_at(token, Utc::now());

    match &status {
        TokenStatus::Fresh { .. } => tracing::info!("{}", status.describe()),
        TokenStatus::Stale { .. } => tracing::warn!("{}", status.describe()),
        TokenStatus::Unparseable { .. } => tracing::warn!("{}", status.describe()),
    }

    status
}
