// Dry-run rendering
// Shows what would be sent without touching the network or the token

use serde_json::{json, Value};

use crate::auth::{
    preview, AccessToken, Credentials, AMZ_JSON_CONTENT_TYPE, INITIATE_AUTH_TARGET,
};
use crate::graphql::GraphQlRequest;
use crate::http_client::request_headers;

fn render_headers(headers: &[(String, String)]) -> Value {
    Value::Array(
        headers
            .iter()
            .map(|(name, value)| Value::String(format!("{}: {}", name, value)))
            .collect(),
    )
}

/// Render a GraphQL dispatch with every secret replaced by its preview
pub fn render_api_request(
    url: &str,
    request: &GraphQlRequest,
    access_token: &AccessToken,
    credentials: &Credentials,
) -> Value {
    let mut shown = request.clone();
    shown.variables.insert(
        GraphQlRequest::TOKEN_VARIABLE.to_string(),
        Value::String(access_token.preview()),
    );

    json!({
        "dryRun": true,
        "method": "POST",
        "url": url,
        "headers": render_headers(&request_headers(request)),
        "body": shown,
        "credentials": {
            "accessToken": access_token.preview(),
            "clientId": credentials.client_id,
            "refreshToken": credentials.refresh_token.as_deref().map(preview),
        }
    })
}

/// Render the InitiateAuth exchange that a renewal would perform
pub fn render_renewal_request(url: &str, credentials: &Credentials) -> Value {
    let headers = [
        ("Content-Type".to_string(), AMZ_JSON_CONTENT_TYPE.to_string()),
        ("X-Amz-Target".to_string(), INITIATE_AUTH_TARGET.to_string()),
    ];

    json!({
        "dryRun": true,
        "method": "POST",
        "url": url,
        "headers": render_headers(&headers),
        "body": {
            "ClientId": credentials.client_id,
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "AuthParameters": {
                "REFRESH_TOKEN": credentials.refresh_token.as_deref().map(preview),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::token_expiring_in;

    fn credentials(token: &AccessToken) -> Credentials {
        Credentials {
            access_token: Some(token.clone()),
            client_id: Some("5abc1defg2hij3klm4nop5qrs6".to_string()),
            refresh_token: Some(format!(
                "eyJjdHkiOiJKV1QiLCJlbmMiOiJBMjU2R0NNIiwiYWxnIjoiUlNBLU9BRVAifQ.{}.tail",
                "r".repeat(300)
            )),
        }
    }

    #[test]
    fn test_api_request_never_contains_secrets() {
        let token = token_expiring_in(3600);
        let creds = credentials(&token);
        let request = GraphQlRequest::new("GetStatus", "query GetStatus { ok }")
            .with_variable("catId", "cat-1");

        let rendered = render_api_request("https://api.test/graphql", &request, &token, &creds);
        let text = rendered.to_string();

        assert!(!text.contains(token.as_str()));
        assert!(!text.contains(creds.refresh_token.as_deref().unwrap()));
        assert_eq!(rendered["body"]["variables"]["token"], token.preview());
        assert_eq!(rendered["credentials"]["accessToken"], token.preview());
        assert_eq!(rendered["body"]["variables"]["catId"], "cat-1");
        assert_eq!(rendered["body"]["operationName"], "GetStatus");
        assert_eq!(rendered["url"], "https://api.test/graphql");
    }

    #[test]
    fn test_api_request_rendering_is_deterministic() {
        let token = token_expiring_in(3600);
        let creds = credentials(&token);
        let request = GraphQlRequest::new("GetStatus", "query GetStatus { ok }");

        let first = render_api_request("https://api.test/graphql", &request, &token, &creds);
        let second = render_api_request("https://api.test/graphql", &request, &token, &creds);
        assert_eq!(first, second);
    }

    #[test]
    fn test_api_request_lists_headers() {
        let token = token_expiring_in(3600);
        let request = GraphQlRequest::new("GetCatAlerts", "query");

        let rendered = render_api_request("u", &request, &token, &Credentials::default());
        let headers = rendered["headers"].as_array().unwrap();

        assert!(headers.contains(&json!("X-APOLLO-OPERATION-NAME: GetCatAlerts")));
        assert!(headers.contains(&json!("Content-Type: application/json")));
        assert!(rendered["credentials"]["refreshToken"].is_null());
    }

    #[test]
    fn test_renewal_request_redacts_refresh_token() {
        let token = token_expiring_in(3600);
        let creds = credentials(&token);

        let rendered = render_renewal_request("https://idp.test/", &creds);
        let text = rendered.to_string();

        assert!(!text.contains(creds.refresh_token.as_deref().unwrap()));
        assert_eq!(rendered["body"]["AuthFlow"], "REFRESH_TOKEN_AUTH");
        assert_eq!(rendered["body"]["ClientId"], "5abc1defg2hij3klm4nop5qrs6");
        assert!(rendered["headers"]
            .as_array()
            .unwrap()
            .contains(&json!("X-Amz-Target: AWSCognitoIdentityProviderService.InitiateAuth")));
    }
}
