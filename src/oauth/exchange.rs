//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for access tokens and fetching
//! the connected account's profile.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;

/// OAuth token exchange request (authorization code + PKCE verifier)
#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
    code_verifier: &'a str,
}

/// Result of a token exchange that reached the provider
#[derive(Debug, PartialEq)]
pub enum TokenExchange {
    /// Provider issued an access token
    Granted { access_token: String },
    /// Provider answered without an access token
    Rejected { description: Option<String> },
}

/// Exchange authorization code for access token
///
/// # Arguments
/// * `token_url` - OAuth token endpoint URL
/// * `code` - Authorization code from callback
/// * `redirect_uri` - Redirect URI used in authorization request
/// * `client_id` / `client_secret` - OAuth client credentials
/// * `code_verifier` - PKCE verifier (empty when none was stored)
///
/// # Returns
/// * `Ok(TokenExchange)` - The provider answered with JSON, with or without a token
/// * `Err` - Transport failure or a non-JSON response body
pub async fn exchange_code_for_token(
    client: &reqwest::Client,
    token_url: &str,
    code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
    code_verifier: &str,
) -> Result<TokenExchange> {
    let form = TokenRequest {
        grant_type: "authorization_code",
        client_id,
        client_secret,
        redirect_uri,
        code,
        code_verifier,
    };

    tracing::debug!("Exchanging authorization code for token at {}", token_url);

    let response = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    // Providers report rejections as JSON bodies on 4xx, so parse regardless of status
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse token response (status {})", status))?;

    Ok(parse_token_response(&body))
}

fn parse_token_response(body: &Value) -> TokenExchange {
    match body.get("access_token").and_then(Value::as_str) {
        Some(token) => TokenExchange::Granted {
            access_token: token.to_string(),
        },
        None => TokenExchange::Rejected {
            description: body
                .get("error_description")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
    }
}

/// Fetch the connected account's profile with a bearer token.
///
/// The body is returned as-is; each provider uses its own shape.
pub async fn fetch_user_profile(
    client: &reqwest::Client,
    userinfo_url: &str,
    access_token: &str,
) -> Result<Value> {
    let response = client
        .get(userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .context("Failed to send profile request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!(
            "Profile request failed with status {}: {}",
            status,
            body
        ));
    }

    response
        .json::<Value>()
        .await
        .context("Failed to parse profile response")
}
