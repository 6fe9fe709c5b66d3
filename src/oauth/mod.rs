//! OAuth 2.0 Authorization Code flow with PKCE for social platforms.
//!
//! Implements the flow:
//! 1. Operator clicks "Connect <platform>"
//! 2. [`OAuthConnector::initiate`] stores a fresh PKCE verifier in the session
//!    and returns the provider's authorization URL
//! 3. Operator authorizes on the provider's site
//! 4. Provider redirects to the shared callback URL with `code` and
//!    `state=<platform>`
//! 5. [`OAuthConnector::handle_callback`] consumes the verifier, exchanges the
//!    code, fetches the profile and records the connection
//! 6. The HTTP layer redirects to the clean dashboard URL so a reload cannot
//!    resubmit the consumed code

mod exchange;
mod pkce;
mod provider;

pub use exchange::{exchange_code_for_token, fetch_user_profile, TokenExchange};
pub use pkce::{code_challenge, PkceVerifier};
pub use provider::{PlatformDescriptor, PlatformId, PlatformRegistry};

use crate::session::{NoticeLevel, SessionState, UserProfile};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};


/// OAuth callback query parameters
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Build from raw query pairs. A repeated key keeps its first value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// True when the page load carries anything the callback handler acts on
    pub fn is_callback(&self) -> bool {
        (self.code.is_some() && self.state.is_some()) || self.error.is_some()
    }
}

/// Connector errors
#[derive(Debug, PartialEq, Clone)]
pub enum ConnectorError {
    /// Platform name is not configured
    UnknownPlatform(String),
    /// Provider redirected back with `error` instead of a code
    AuthorizationDenied(String),
    /// Token endpoint answered without an access token
    TokenRejected(String),
    /// Network failure or unparseable response
    Transport(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::UnknownPlatform(name) => write!(f, "Unknown platform '{}'", name),
            ConnectorError::AuthorizationDenied(msg) => {
                write!(f, "Authorization failed: {}", msg)
            }
            ConnectorError::TokenRejected(msg) => {
                write!(f, "Failed to get access token: {}", msg)
            }
            ConnectorError::Transport(msg) => write!(f, "Error during authentication: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

/// Result of processing a callback page load
#[derive(Debug, PartialEq)]
pub enum CallbackOutcome {
    /// Query carried no callback parameters
    Ignored,
    Connected {
        platform: PlatformId,
        display_name: String,
    },
    Failed(ConnectorError),
}

/// Drives the PKCE flow against the configured platforms
pub struct OAuthConnector {
    registry: Arc<PlatformRegistry>,
    redirect_uri: String,
    http_client: reqwest::Client,
}

impl OAuthConnector {
    pub fn new(registry: Arc<PlatformRegistry>, redirect_uri: impl Into<String>) -> Self {
        Self {
            registry,
            redirect_uri: redirect_uri.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Start an authorization attempt and return the URL to send the browser to.
    ///
    /// The verifier is written to the session before the URL is returned.
    /// No network I/O happens here.
    pub fn initiate(
        &self,
        session: &mut SessionState,
        platform: &str,
    ) -> Result<String, ConnectorError> {
        let descriptor = self
            .registry
            .get(platform)
            .ok_or_else(|| ConnectorError::UnknownPlatform(platform.to_string()))?;

        let verifier = PkceVerifier::generate();
        let challenge = verifier.challenge();
        session.store_verifier(descriptor.id.clone(), verifier);

        debug!(platform = %descriptor.id, "Authorization URL built");
        Ok(descriptor.build_auth_url(&self.redirect_uri, &challenge))
    }

    /// Process a redirect back from a provider.
    ///
    /// The verifier for `state` is removed whatever the outcome, so an
    /// authorization code can be exchanged at most once per `initiate`.
    /// Success and failure are also queued as session notices.
    pub async fn handle_callback(
        &self,
        session: &mut SessionState,
        params: &CallbackParams,
    ) -> CallbackOutcome {
        let outcome = self.process_callback(session, params).await;

        match &outcome {
            CallbackOutcome::Ignored => {}
            CallbackOutcome::Connected { platform, .. } => {
                session.push_notice(NoticeLevel::Success, format!("Connected to {}!", platform));
            }
            CallbackOutcome::Failed(e) => {
                session.push_notice(NoticeLevel::Error, e.to_string());
            }
        }

        outcome
    }

    async fn process_callback(
        &self,
        session: &mut SessionState,
        params: &CallbackParams,
    ) -> CallbackOutcome {
        let (code, state) = match (&params.code, &params.state) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                if let Some(error) = &params.error {
                    return self.authorization_denied(session, params, error);
                }
                return CallbackOutcome::Ignored;
            }
        };

        let descriptor = match self.registry.get(state) {
            Some(descriptor) => descriptor,
            None => {
                warn!(state = %state, "Callback for unknown platform");
                return CallbackOutcome::Failed(ConnectorError::UnknownPlatform(state.clone()));
            }
        };
        let platform = descriptor.id.clone();

        // Single-use: gone before the exchange is even attempted
        let verifier = session.take_verifier(&platform);
        if verifier.is_none() {
            debug!(platform = %platform, "No stored verifier; sending empty code_verifier");
        }
        let code_verifier = verifier.as_ref().map(PkceVerifier::as_str).unwrap_or("");

        let exchange = exchange_code_for_token(
            &self.http_client,
            &descriptor.token_url,
            code,
            &self.redirect_uri,
            &descriptor.client_id,
            &descriptor.client_secret,
            code_verifier,
        )
        .await;

        let access_token = match exchange {
            Ok(TokenExchange::Granted { access_token }) => access_token,
            Ok(TokenExchange::Rejected { description }) => {
                warn!(platform = %platform, "Token exchange rejected by provider");
                return CallbackOutcome::Failed(ConnectorError::TokenRejected(
                    description.unwrap_or_else(|| "no access token in response".to_string()),
                ));
            }
            Err(e) => {
                warn!(platform = %platform, error = %e, "Token exchange failed");
                return CallbackOutcome::Failed(ConnectorError::Transport(format!("{:#}", e)));
            }
        };

        let profile =
            match fetch_user_profile(&self.http_client, &descriptor.userinfo_url, &access_token)
                .await
            {
                Ok(raw) => UserProfile::new(raw),
                Err(e) => {
                    warn!(platform = %platform, error = %e, "Profile fetch failed");
                    return CallbackOutcome::Failed(ConnectorError::Transport(format!("{:#}", e)));
                }
            };

        let display_name = profile.display_name();
        session.connect(platform.clone(), access_token, profile);

        info!(platform = %platform, "Platform connected");

        CallbackOutcome::Connected {
            platform,
            display_name,
        }
    }

    fn authorization_denied(
        &self,
        session: &mut SessionState,
        params: &CallbackParams,
        error: &str,
    ) -> CallbackOutcome {
        if let Some(platform) = params.state.as_deref().and_then(|s| self.registry.resolve(s)) {
            session.take_verifier(&platform);
        }

        let message = params
            .error_description
            .clone()
            .unwrap_or_else(|| error.to_string());
        warn!(state = ?params.state, error = %error, "Provider returned authorization error");
        CallbackOutcome::Failed(ConnectorError::AuthorizationDenied(message))
    }

    /// Remove the connection and profile for `platform`.
    ///
    /// Idempotent: disconnecting a platform that is not connected (or not
    /// configured) changes nothing. Returns true if a connection was removed.
    pub fn disconnect(&self, session: &mut SessionState, platform: &str) -> bool {
        let removed = session.disconnect(platform);
        if removed {
            info!(platform = %platform, "Platform disconnected");
        }
        removed
    }
}
