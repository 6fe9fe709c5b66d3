use super::*;
use crate::config::DashboardConfig;
use crate::oauth::PlatformRegistry;
use serde_json::json;

fn platform(name: &str) -> PlatformId {
    PlatformRegistry::from_config(&DashboardConfig::default().platforms).unwrap()
        .resolve(name)
        .unwrap()
}

#[test]
fn test_display_name_variants() {
    assert_eq!(
        UserProfile::new(json!({"name": "Acme Page", "username": "acme"})).display_name(),
        "Acme Page"
    );
    assert_eq!(
        UserProfile::new(json!({"id": "1", "username": "acme.co"})).display_name(),
        "acme.co"
    );
    assert_eq!(
        UserProfile::new(json!({"data": {"id": "1", "name": "Acme", "username": "acme"}}))
            .display_name(),
        "Acme"
    );
    assert_eq!(
        UserProfile::new(json!({"data": {"username": "acme"}})).display_name(),
        "acme"
    );
    assert_eq!(UserProfile::new(json!({"id": "1"})).display_name(), "Connected");
    assert_eq!(UserProfile::new(json!([])).display_name(), "Connected");
}

#[test]
fn test_default_business_profile() {
    let session = SessionState::new();
    let business = session.business_info();
    assert_eq!(business.name, "");
    assert!(business.logo.is_none());
    assert_eq!(business.color, "#8B5CF6");
}

#[test]
fn test_connect_and_disconnect_keep_maps_in_step() {
    let mut session = SessionState::new();
    let facebook = platform("Facebook");
    let twitter = platform("Twitter");

    session.connect(facebook, "fb".to_string(), UserProfile::new(json!({"name": "A"})));
    session.connect(twitter, "tw".to_string(), UserProfile::new(json!({"name": "B"})));
    assert_eq!(session.connection_count(), 2);

    for name in ["Facebook", "Twitter", "Instagram"] {
        assert_eq!(session.is_connected(name), session.user_profile(name).is_some());
    }

    assert!(session.disconnect("Twitter"));
    assert!(!session.disconnect("Twitter"));
    assert!(session.user_profile("Twitter").is_none());
    assert_eq!(session.access_token("Facebook"), Some("fb"));

    let names: Vec<&str> = session.connected_platforms().map(|p| p.as_str()).collect();
    assert_eq!(names, vec!["Facebook"]);
}

#[test]
fn test_reconnect_replaces_token() {
    let mut session = SessionState::new();
    session.connect(platform("Facebook"), "old".to_string(), UserProfile::new(json!({})));
    session.connect(
        platform("Facebook"),
        "new".to_string(),
        UserProfile::new(json!({"name": "New"})),
    );

    assert_eq!(session.connection_count(), 1);
    assert_eq!(session.access_token("Facebook"), Some("new"));
    assert_eq!(session.user_profile("Facebook").unwrap().display_name(), "New");
}

#[test]
fn test_verifier_is_single_use() {
    let mut session = SessionState::new();
    let facebook = platform("Facebook");
    let verifier = PkceVerifier::generate();

    session.store_verifier(facebook.clone(), verifier.clone());
    assert_eq!(session.verifier(&facebook), Some(&verifier));

    assert_eq!(session.take_verifier(&facebook), Some(verifier));
    assert_eq!(session.take_verifier(&facebook), None);
}

#[test]
fn test_verifiers_scoped_per_platform() {
    let mut session = SessionState::new();
    let facebook = platform("Facebook");
    let twitter = platform("Twitter");

    session.store_verifier(facebook.clone(), PkceVerifier::generate());
    assert!(session.take_verifier(&twitter).is_none());
    assert!(session.verifier(&facebook).is_some());
}

#[test]
fn test_notices_drain() {
    let mut session = SessionState::new();
    session.push_notice(NoticeLevel::Success, "Business profile saved!");
    session.push_notice(NoticeLevel::Error, "boom");

    let notices = session.drain_notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert!(session.drain_notices().is_empty());
}

#[test]
fn test_transcript_is_append_only() {
    let mut session = SessionState::new();
    session.append_message(ChatMessage::new(Role::User, "hi"));
    session.append_message(ChatMessage::new(Role::Assistant, "hello"));

    let history = session.chat_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].content, "hello");
    assert_eq!(history[0].time.len(), 8); // HH:MM:SS
}

#[test]
fn test_chat_message_serialization() {
    let message = ChatMessage::new(Role::Assistant, "Try a poll");
    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "Try a poll");
    assert!(json["timestamp"].is_string());
    assert!(json["time"].is_string());
}

#[tokio::test]
async fn test_store_get_or_create() {
    let store = SessionStore::new();

    let (id, session) = store.get_or_create(None);
    assert_eq!(store.count(), 1);

    let (same_id, same_session) = store.get_or_create(Some(id));
    assert_eq!(same_id, id);
    assert!(Arc::ptr_eq(&session, &same_session));

    // Unknown id (e.g. cookie from a previous process) gets a fresh session
    let (new_id, _) = store.get_or_create(Some(Uuid::new_v4()));
    assert_ne!(new_id, id);
    assert_eq!(store.count(), 2);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = SessionStore::new();
    let (a_id, a) = store.get_or_create(None);
    let (b_id, b) = store.get_or_create(None);
    assert_ne!(a_id, b_id);

    a.lock()
        .await
        .connect(platform("Facebook"), "tok".to_string(), UserProfile::new(json!({})));

    assert!(a.lock().await.is_connected("Facebook"));
    assert!(!b.lock().await.is_connected("Facebook"));
    assert!(store.get(&b_id).is_some());
}

#[tokio::test]
async fn test_idle_sessions_are_evicted() {
    let store = SessionStore::with_idle_timeout(Duration::from_secs(60));

    let (idle_id, idle) = store.get_or_create(None);
    idle.lock().await.set_business_info(BusinessProfile {
        name: "Acme".to_string(),
        ..BusinessProfile::default()
    });
    drop(idle);
    let (held_id, held) = store.get_or_create(None);
    assert_eq!(store.count(), 2);

    // Nothing is idle yet
    assert_eq!(store.evict_idle(Instant::now()), 0);

    // Sessions still held by a handler survive past the timeout
    let later = Instant::now() + Duration::from_secs(61);
    assert_eq!(store.evict_idle(later), 1);
    assert_eq!(store.count(), 1);
    assert!(store.get(&idle_id).is_none());
    assert!(store.get(&held_id).is_some());

    // An evicted id comes back as a fresh session
    let (new_id, fresh) = store.get_or_create(Some(idle_id));
    assert_ne!(new_id, idle_id);
    assert_eq!(fresh.lock().await.business_info().name, "");

    drop(held);
}

#[tokio::test]
async fn test_lookup_refreshes_last_seen() {
    let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
    let (id, session) = store.get_or_create(None);
    drop(session);

    let start = Instant::now();
    assert!(store.get(&id).is_some());
    assert_eq!(store.evict_idle(start + Duration::from_secs(59)), 0);
    assert_eq!(store.evict_idle(start + Duration::from_secs(120)), 1);
}
