// Authenticated GraphQL invocation
// Pre-flight freshness check, dispatch, and a single renewal-and-retry on auth failure

use serde_json::Value;

use crate::auth::{token, AccessToken, IdentityProvider, TokenRenewer};
use crate::error::{CatalysisError, Result};
use crate::graphql::{AuthFailureSignal, GraphQlRequest};
use crate::http_client::ApiTransport;

/// Retries allowed after the API reports an auth failure
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Outcome of one logical operation
#[derive(Debug)]
pub struct Invocation {
    /// Last response received, returned verbatim
    pub response: Value,

    /// Token in effect at the end of the operation
    pub access_token: AccessToken,

    pub dispatches: u32,
    pub renewals: u32,
}

/// Runs GraphQL operations with transparent credential management
pub struct AuthenticatedInvoker<T, P> {
    transport: T,
    renewer: TokenRenewer<P>,
}

impl<T: ApiTransport, P: IdentityProvider> AuthenticatedInvoker<T, P> {
    pub fn new(transport: T, renewer: TokenRenewer<P>) -> Self {
        Self { transport, renewer }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn renewer(&self) -> &TokenRenewer<P> {
        &self.renewer
    }

    /// Perform one logical operation
    ///
    /// The token is renewed up front when stale; a stale token that cannot be
    /// renewed aborts with `RefreshFailed` before anything is sent. If the API
    /// answers with an UNAUTHENTICATED error, the token is renewed once and the
    /// same payload is sent once more. Whatever that second dispatch returns is
    /// final. The token in effect afterwards is handed back in the result.
    pub async fn execute(
        &self,
        access_token: AccessToken,
        mut request: GraphQlRequest,
    ) -> Result<Invocation> {
        let mut token = access_token;
        let mut renewals = 0;

        if token::inspect(&token).needs_renewal() {
            tracing::info!("Access token is stale, renewing before dispatch");
            token = self.renewer.renew().await.map_err(|e| {
                tracing::error!("Pre-flight token refresh failed: {}", e);
                CatalysisError::RefreshFailed(Box::new(e))
            })?;
            renewals += 1;
        }

        let mut attempt = 0;

        loop {
            request.set_token(&token);

            tracing::debug!(
                operation = %request.operation_name,
                attempt = attempt + 1,
                max_retries = MAX_AUTH_RETRIES,
                "Dispatching operation"
            );

            let response = self.transport.send(&request).await?;

            let Some(signal) = AuthFailureSignal::detect(&response) else {
                return Ok(Invocation {
                    response,
                    access_token: token,
                    dispatches: attempt + 1,
                    renewals,
                });
            };

            if attempt >= MAX_AUTH_RETRIES {
                tracing::warn!(
                    message = ?signal.message,
                    "API still rejects the access token after renewal, returning its response"
                );
                return Ok(Invocation {
                    response,
                    access_token: token,
                    dispatches: attempt + 1,
                    renewals,
                });
            }

            tracing::warn!(
                message = ?signal.message,
                "API rejected the access token, renewing and retrying once"
            );

            match self.renewer.renew().await {
                Ok(renewed) => {
                    token = renewed;
                    renewals += 1;
                }
                Err(e) => {
                    tracing::error!("Token refresh after auth failure failed: {}", e);
                    return Ok(Invocation {
                        response,
                        access_token: token,
                        dispatches: attempt + 1,
                        renewals,
                    });
                }
            }

            attempt += 1;
        }
    }
}
