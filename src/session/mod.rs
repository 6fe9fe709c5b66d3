//! Per-browser-session state.
//!
//! Every session owns one [`SessionState`] behind an async mutex. A handler
//! holds the lock for the whole interaction (provider calls included), so a
//! session is served by one logical thread of control at a time while
//! different sessions never share state.

use crate::chat::AssistantHandle;
use crate::oauth::{PkceVerifier, PlatformId};
use chrono::{DateTime, Local, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Idle time after which a session is dropped from the store
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Accent color used until the operator saves a profile
pub const DEFAULT_ACCENT_COLOR: &str = "#8B5CF6";

/// Provider profile response, stored without schema validation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserProfile(Value);

impl UserProfile {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Name to show next to a connected platform.
    ///
    /// Facebook and Instagram answer with top-level `name`/`username`;
    /// Twitter v2 nests them under `data`.
    pub fn display_name(&self) -> String {
        let candidates = [
            self.0.get("name"),
            self.0.get("username"),
            self.0.get("data").and_then(|d| d.get("name")),
            self.0.get("data").and_then(|d| d.get("username")),
        ];

        candidates
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or("Connected")
            .to_string()
    }
}

/// Operator's business profile
#[derive(Clone, Debug, PartialEq)]
pub struct BusinessProfile {
    pub name: String,
    /// Raw image bytes (PNG/JPEG)
    pub logo: Option<Vec<u8>>,
    /// `#RRGGBB`
    pub color: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            logo: None,
            color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

/// Transcript message author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            role,
            content: content.into(),
            timestamp,
            time: timestamp.with_timezone(&Local).format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-visible message shown on the next dashboard read
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// State owned by a single browser session
#[derive(Default)]
pub struct SessionState {
    connections: BTreeMap<PlatformId, String>,
    user_info: BTreeMap<PlatformId, UserProfile>,
    verifiers: HashMap<PlatformId, PkceVerifier>,
    chat_history: Vec<ChatMessage>,
    business_info: BusinessProfile,
    notices: Vec<Notice>,
    pub(crate) assistant: AssistantHandle,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Connections ---

    /// Record a connection together with its profile.
    ///
    /// Both maps are written here and only here, so a connection exists
    /// iff its profile does. Replaces any previous connection for `platform`.
    pub fn connect(&mut self, platform: PlatformId, access_token: String, profile: UserProfile) {
        self.connections.insert(platform.clone(), access_token);
        self.user_info.insert(platform, profile);
        self.assistant.invalidate();
    }

    /// Remove a connection and its profile. Returns true if one existed.
    pub fn disconnect(&mut self, platform: &str) -> bool {
        let removed = self.connections.remove(platform).is_some();
        self.user_info.remove(platform);
        if removed {
            self.assistant.invalidate();
        }
        removed
    }

    pub fn is_connected(&self, platform: &str) -> bool {
        self.connections.contains_key(platform)
    }

    /// Access token for a connected platform
    pub fn access_token(&self, platform: &str) -> Option<&str> {
        self.connections.get(platform).map(String::as_str)
    }

    pub fn user_profile(&self, platform: &str) -> Option<&UserProfile> {
        self.user_info.get(platform)
    }

    /// Connected platforms in name order
    pub fn connected_platforms(&self) -> impl Iterator<Item = &PlatformId> {
        self.connections.keys()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // --- PKCE verifiers ---

    /// Store the verifier for an in-flight authorization, replacing any older one
    pub fn store_verifier(&mut self, platform: PlatformId, verifier: PkceVerifier) {
        self.verifiers.insert(platform, verifier);
    }

    /// Remove and return the verifier (single-use)
    pub fn take_verifier(&mut self, platform: &PlatformId) -> Option<PkceVerifier> {
        self.verifiers.remove(platform)
    }

    pub fn verifier(&self, platform: &PlatformId) -> Option<&PkceVerifier> {
        self.verifiers.get(platform)
    }

    // --- Business profile ---

    pub fn business_info(&self) -> &BusinessProfile {
        &self.business_info
    }

    /// Replace the business profile and drop the assistant context built from it
    pub fn set_business_info(&mut self, profile: BusinessProfile) {
        self.business_info = profile;
        self.assistant.invalidate();
    }

    // --- Transcript ---

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn append_message(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
    }

    // --- Notices ---

    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn assistant(&self) -> &AssistantHandle {
        &self.assistant
    }
}

pub type SharedSession = Arc<Mutex<SessionState>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Process-wide table of sessions keyed by session id.
///
/// In-memory only; everything is lost on restart. A session lives as long as
/// its browser keeps using it: entries idle for longer than the configured
/// timeout are swept whenever a new session is created.
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Look up the session for `id`, creating a fresh one when the id is
    /// absent or unknown (e.g. a cookie from before a restart or one that
    /// has been evicted).
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession) {
        if let Some(id) = id {
            if let Some(session) = self.get(&id) {
                return (id, session);
            }
        }

        self.evict_idle(Instant::now());

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(SessionState::new()));
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(session = %id, "Created session");
        (id, session)
    }

    /// Existing session for `id`, refreshing its last-seen time. Never creates.
    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_seen = Instant::now();
            Arc::clone(&entry.session)
        })
    }

    /// Drop sessions idle for longer than the timeout as of `now`.
    ///
    /// A session a handler still holds is kept regardless of age. Returns the
    /// number of sessions removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            Arc::strong_count(&entry.session) > 1
                || now.saturating_duration_since(entry.last_seen) < self.idle_timeout
        });
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
