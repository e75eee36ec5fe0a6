// Authentication module
// Token expiry inspection, renewal, and credential loading

mod refresh;
pub mod token;
mod types;

pub use refresh::{
    CognitoClient, IdentityProvider, TokenRenewer, AMZ_JSON_CONTENT_TYPE, DEFAULT_IDP_URL,
    INITIATE_AUTH_TARGET,
};
pub use token::{TokenStatus, RENEWAL_BUFFER_SECS};
pub use types::{preview, AccessToken, Claims, Credentials, InitiateAuthRequest};
