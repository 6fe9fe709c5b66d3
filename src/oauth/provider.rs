//! OAuth platform descriptors.
//!
//! Defines the OAuth 2.0 configuration for each supported social platform.

use crate::config::PlatformConfig;
use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Platform identifier (e.g. "Facebook").
///
/// Only constructed by [`PlatformRegistry`], so holding one means the
/// platform is configured.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by PlatformId be queried with a plain name
impl Borrow<str> for PlatformId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OAuth platform descriptor
#[derive(Clone, Debug)]
pub struct PlatformDescriptor {
    pub id: PlatformId,

    /// OAuth authorization endpoint URL
    pub authorize_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// Profile endpoint called with the access token
    pub userinfo_url: String,

    /// Requested scope, passed through as configured
    pub scope: String,

    pub client_id: String,

    pub client_secret: String,

    /// Display icon shown next to the connect button
    pub icon_path: Option<String>,
}

impl PlatformDescriptor {
    /// Build authorization URL with PKCE challenge and redirect_uri.
    ///
    /// `state` carries the platform name so the shared callback can tell
    /// which provider redirected back.
    pub fn build_auth_url(&self, redirect_uri: &str, code_challenge: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.scope),
            urlencoding::encode(self.id.as_str()),
            urlencoding::encode(code_challenge)
        )
    }
}

/// Immutable set of configured platforms, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct PlatformRegistry {
    platforms: BTreeMap<PlatformId, PlatformDescriptor>,
}

impl PlatformRegistry {
    /// Build the registry, parsing every endpoint URL.
    ///
    /// URLs are stored in their normalized form (spaces and non-ASCII
    /// percent-encoded), so an authorization URL built from them is always a
    /// valid `Location` header.
    pub fn from_config(platforms: &BTreeMap<String, PlatformConfig>) -> Result<Self> {
        let mut registry = BTreeMap::new();

        for (name, config) in platforms {
            let id = PlatformId(name.clone());
            let descriptor = PlatformDescriptor {
                id: id.clone(),
                authorize_url: normalize_url(name, "authorize_url", &config.authorize_url)?,
                token_url: normalize_url(name, "token_url", &config.token_url)?,
                userinfo_url: normalize_url(name, "userinfo_url", &config.userinfo_url)?,
                scope: config.scope.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                icon_path: config.icon_path.clone(),
            };
            registry.insert(id, descriptor);
        }

        Ok(Self {
            platforms: registry,
        })
    }

    /// Get platform descriptor by name
    pub fn get(&self, name: &str) -> Option<&PlatformDescriptor> {
        self.platforms.get(name)
    }

    /// Resolve a name to its identifier if the platform is configured
    pub fn resolve(&self, name: &str) -> Option<PlatformId> {
        self.get(name).map(|p| p.id.clone())
    }

    /// All platforms in name order
    pub fn iter(&self) -> impl Iterator<Item = &PlatformDescriptor> {
        self.platforms.values()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

fn normalize_url(platform: &str, field: &str, raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .with_context(|| format!("Invalid {} for platform '{}': {}", field, platform, raw))?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;

    fn test_descriptor() -> PlatformDescriptor {
        PlatformDescriptor {
            id: PlatformId("Twitter".to_string()),
            authorize_url: "https://example.com/oauth/authorize".to_string(),
            token_url: "https://example.com/oauth/token".to_string(),
            userinfo_url: "https://example.com/me".to_string(),
            scope: "tweet.read users.read".to_string(),
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            icon_path: None,
        }
    }

    #[test]
    fn test_registry_from_default_config() {
        let registry = PlatformRegistry::from_config(&DashboardConfig::default().platforms).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get("Facebook").unwrap().authorize_url,
            "https://www.facebook.com/v19.0/dialog/oauth"
        );
        assert!(registry.get("Instagram").is_some());
        assert!(registry.get("Twitter").is_some());
        assert!(registry.get("facebook").is_none());
        assert!(registry.resolve("MySpace").is_none());
        assert_eq!(registry.resolve("Twitter").unwrap().as_str(), "Twitter");
    }

    #[test]
    fn test_build_auth_url() {
        let url = test_descriptor().build_auth_url("http://localhost:8501/", "challenge_abc");

        assert!(url.starts_with("https://example.com/oauth/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8501%2F"));
        // URL encoding converts spaces to %20
        assert!(url.contains("scope=tweet.read%20users.read"));
        assert!(url.contains("state=Twitter"));
        assert!(url.contains("code_challenge=challenge_abc"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(!url.contains("client_secret"));
    }

    fn config_with_authorize_url(authorize_url: &str) -> BTreeMap<String, PlatformConfig> {
        let mut platforms = BTreeMap::new();
        platforms.insert(
            "Facebook".to_string(),
            PlatformConfig {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                authorize_url: authorize_url.to_string(),
                token_url: "https://example.com/token".to_string(),
                userinfo_url: "https://example.com/me".to_string(),
                scope: "read".to_string(),
                icon_path: None,
            },
        );
        platforms
    }

    #[test]
    fn test_registry_normalizes_header_unsafe_urls() {
        let registry =
            PlatformRegistry::from_config(&config_with_authorize_url("https://example.com/o auth/ü"))
                .unwrap();

        let descriptor = registry.get("Facebook").unwrap();
        assert_eq!(descriptor.authorize_url, "https://example.com/o%20auth/%C3%BC");

        let url = descriptor.build_auth_url("http://localhost:8501/", "challenge");
        assert!(axum::http::HeaderValue::from_str(&url).is_ok());
    }

    #[test]
    fn test_registry_rejects_invalid_url() {
        let err = PlatformRegistry::from_config(&config_with_authorize_url("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid authorize_url for platform 'Facebook'"));
    }
}
