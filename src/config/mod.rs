use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;


/// Complete dashboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub chat: ChatConfig,
    /// Platform name -> OAuth endpoints and credentials
    #[serde(default = "default_platforms")]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Seconds a browser session may sit idle before it is dropped
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_session_idle_timeout_secs() -> u64 {
    3600
}

impl ServerConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
        }
    }
}

/// OAuth settings shared by every platform
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthSettings {
    /// The single callback URL registered with every provider
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:8501/".to_string()
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            redirect_uri: default_redirect_uri(),
        }
    }
}

/// Chat provider configuration (Gemini generateContent API)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// API key; usually supplied through SOCIALAI_CHAT_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            api_base: default_api_base(),
        }
    }
}

/// Per-platform OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
    #[serde(default)]
    pub icon_path: Option<String>,
}

fn platform(
    authorize_url: &str,
    token_url: &str,
    userinfo_url: &str,
    scope: &str,
    icon_path: &str,
) -> PlatformConfig {
    PlatformConfig {
        client_id: String::new(),
        client_secret: String::new(),
        authorize_url: authorize_url.to_string(),
        token_url: token_url.to_string(),
        userinfo_url: userinfo_url.to_string(),
        scope: scope.to_string(),
        icon_path: Some(icon_path.to_string()),
    }
}

/// Built-in platforms. Credentials are empty until supplied by file or env.
fn default_platforms() -> BTreeMap<String, PlatformConfig> {
    let mut platforms = BTreeMap::new();
    platforms.insert(
        "Facebook".to_string(),
        platform(
            "https://www.facebook.com/v19.0/dialog/oauth",
            "https://graph.facebook.com/v19.0/oauth/access_token",
            "https://graph.facebook.com/me",
            "pages_manage_posts,pages_read_engagement",
            "facebook.png",
        ),
    );
    platforms.insert(
        "Twitter".to_string(),
        platform(
            "https://twitter.com/i/oauth2/authorize",
            "https://api.twitter.com/2/oauth2/token",
            "https://api.twitter.com/2/users/me",
            "tweet.read tweet.write users.read offline.access",
            "x.png",
        ),
    );
    platforms.insert(
        "Instagram".to_string(),
        platform(
            "https://api.instagram.com/oauth/authorize",
            "https://api.instagram.com/oauth/access_token",
            "https://graph.instagram.com/me",
            "user_profile,user_media",
            "instagram.png",
        ),
    );
    platforms
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            oauth: OAuthSettings::default(),
            chat: ChatConfig::default(),
            platforms: default_platforms(),
        }
    }
}

impl DashboardConfig {
    /// Apply SOCIALAI_* environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests).
    ///
    /// Secrets follow `SOCIALAI_OAUTH_<PLATFORM>_CLIENT_ID` / `_CLIENT_SECRET`
    /// with the platform name upper-cased.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SOCIALAI_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("SOCIALAI_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
        if let Some(v) = lookup("SOCIALAI_CHAT_API_KEY") {
            self.chat.api_key = Some(v);
        }
        if let Some(v) = lookup("SOCIALAI_CHAT_MODEL") {
            self.chat.model = v;
        }

        for (name, platform) in self.platforms.iter_mut() {
            let env_prefix = name.to_uppercase();
            if let Some(v) = lookup(&format!("SOCIALAI_OAUTH_{}_CLIENT_ID", env_prefix)) {
                platform.client_id = v;
            }
            if let Some(v) = lookup(&format!("SOCIALAI_OAUTH_{}_CLIENT_SECRET", env_prefix)) {
                platform.client_secret = v;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<DashboardConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let config: DashboardConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    Ok(config)
}
