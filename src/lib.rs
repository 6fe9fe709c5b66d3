// Configuration (TOML + env overrides)
pub mod config;

// OAuth 2.0 + PKCE connector for social platforms
pub mod oauth;

// Per-browser-session state
pub mod session;

// Context-primed chat assistant
pub mod chat;

// HTTP API
pub mod api;
