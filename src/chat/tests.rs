//! Unit tests for context assembly and the assistant handle

use super::*;
use crate::config::DashboardConfig;
use crate::oauth::PlatformRegistry;
use crate::session::UserProfile;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Provider that echoes and records every prompt
struct RecordingProvider {
    prompts: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

#[async_trait]
impl ChatProvider for RecordingProvider {
    fn model(&self) -> &str {
        "test-model"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            anyhow::bail!("quota exceeded");
        }
        Ok(format!("reply #{}", self.prompts.lock().unwrap().len()))
    }
}

#[derive(Default)]
struct TestFactory {
    prompts: Arc<Mutex<Vec<String>>>,
    builds: AtomicUsize,
    fail_build: AtomicBool,
    fail_complete: bool,
}

impl ChatProviderFactory for TestFactory {
    fn model(&self) -> &str {
        "test-model"
    }

    fn build(&self) -> anyhow::Result<Arc<dyn ChatProvider>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_build.load(Ordering::SeqCst) {
            anyhow::bail!("missing API key");
        }
        Ok(Arc::new(RecordingProvider {
            prompts: Arc::clone(&self.prompts),
            fail: self.fail_complete,
        }))
    }
}

fn registry() -> PlatformRegistry {
    PlatformRegistry::from_config(&DashboardConfig::default().platforms).unwrap()
}

fn acme_business() -> BusinessProfile {
    BusinessProfile {
        name: "Acme".to_string(),
        ..BusinessProfile::default()
    }
}

#[test]
fn test_build_context_acme_facebook() {
    let registry = registry();
    let mut session = SessionState::new();
    session.set_business_info(acme_business());
    session.connect(
        registry.resolve("Facebook").unwrap(),
        "tok_abc".to_string(),
        UserProfile::new(json!({"name": "Acme Page"})),
    );

    assert_eq!(session_context(&session), "Business: Acme, Platforms: Facebook");
}

#[test]
fn test_build_context_defaults() {
    let session = SessionState::new();
    assert_eq!(
        session_context(&session),
        "Business: Not provided, Platforms: None"
    );
}

#[test]
fn test_build_context_multiple_platforms_in_name_order() {
    let registry = registry();
    let twitter = registry.resolve("Twitter").unwrap();
    let facebook = registry.resolve("Facebook").unwrap();

    let context = build_context(&acme_business(), [&twitter, &facebook]);
    assert_eq!(context, "Business: Acme, Platforms: Twitter, Facebook");

    let mut session = SessionState::new();
    session.set_business_info(acme_business());
    session.connect(twitter, "t".to_string(), UserProfile::new(json!({})));
    session.connect(facebook, "f".to_string(), UserProfile::new(json!({})));
    assert_eq!(
        session_context(&session),
        "Business: Acme, Platforms: Facebook, Twitter"
    );
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let factory = TestFactory::default();
    let mut session = SessionState::new();

    let err = send_message(&mut session, &factory, "   ").await.unwrap_err();
    assert_eq!(err, ChatError::EmptyMessage);
    assert!(session.chat_history().is_empty());
    assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_message_stored_as_entered() {
    let factory = TestFactory::default();
    let mut session = SessionState::new();

    let appended = send_message(&mut session, &factory, "  Post ideas?\n")
        .await
        .unwrap();

    assert_eq!(appended[0].content, "  Post ideas?\n");
    assert_eq!(session.chat_history()[0].content, "  Post ideas?\n");
    let prompts = factory.prompts.lock().unwrap();
    assert!(prompts[0].ends_with("User:   Post ideas?\n\nSocialAI:"));
}

#[tokio::test]
async fn test_send_message_appends_both_turns() {
    let factory = TestFactory::default();
    let mut session = SessionState::new();
    session.set_business_info(acme_business());

    let appended = send_message(&mut session, &factory, "Give me post ideas")
        .await
        .unwrap();

    assert_eq!(appended.len(), 2);
    assert_eq!(appended[0].role, Role::User);
    assert_eq!(appended[0].content, "Give me post ideas");
    assert_eq!(appended[1].role, Role::Assistant);
    assert_eq!(appended[1].content, "reply #1");
    assert_eq!(session.chat_history(), appended.as_slice());

    assert!(session.assistant().is_ready());
    let prompts = factory.prompts.lock().unwrap();
    assert!(prompts[0].contains("SocialAI: Business: Acme, Platforms: None"));
    assert!(prompts[0].ends_with("User: Give me post ideas\nSocialAI:"));
}

#[tokio::test]
async fn test_conversation_memory_accumulates() {
    let factory = TestFactory::default();
    let mut session = SessionState::new();

    send_message(&mut session, &factory, "first").await.unwrap();
    send_message(&mut session, &factory, "second").await.unwrap();

    assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    let memory = session.assistant().conversation().unwrap().memory();
    assert_eq!(memory.len(), 3); // context + two exchanges

    let prompts = factory.prompts.lock().unwrap();
    assert!(prompts[1].contains("User: first\nSocialAI: reply #1"));
    assert_eq!(session.chat_history().len(), 4);
}

#[tokio::test]
async fn test_provider_failure_becomes_assistant_message() {
    let factory = TestFactory {
        fail_complete: true,
        ..TestFactory::default()
    };
    let mut session = SessionState::new();

    let appended = send_message(&mut session, &factory, "hello").await.unwrap();

    assert_eq!(appended[0].content, "hello");
    assert_eq!(
        appended[1].content,
        "Sorry, I encountered an error: quota exceeded"
    );
    assert_eq!(session.chat_history().len(), 2);
    // The failed exchange is not remembered, but the handle stays usable
    assert!(session.assistant().is_ready());
    assert_eq!(session.assistant().conversation().unwrap().memory().len(), 1);
}

#[tokio::test]
async fn test_failed_initialization_stays_uninitialized_and_retries() {
    let factory = TestFactory::default();
    factory.fail_build.store(true, Ordering::SeqCst);
    let mut session = SessionState::new();

    let appended = send_message(&mut session, &factory, "hello").await.unwrap();
    assert_eq!(
        appended[1].content,
        "Sorry, I encountered an error: missing API key"
    );
    assert!(!session.assistant().is_ready());

    let notices = session.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("Error initializing chatbot"));

    // Next interaction retries from scratch
    factory.fail_build.store(false, Ordering::SeqCst);
    let appended = send_message(&mut session, &factory, "again").await.unwrap();
    assert_eq!(appended[1].content, "reply #1");
    assert!(session.assistant().is_ready());
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_context_rebuilt_after_changes() {
    let registry = registry();
    let factory = TestFactory::default();
    let mut session = SessionState::new();

    send_message(&mut session, &factory, "hi").await.unwrap();
    assert!(session.assistant().is_ready());

    session.set_business_info(acme_business());
    assert!(!session.assistant().is_ready());

    session.connect(
        registry.resolve("Instagram").unwrap(),
        "ig".to_string(),
        UserProfile::new(json!({"username": "acme"})),
    );
    send_message(&mut session, &factory, "what now?").await.unwrap();

    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    let prompts = factory.prompts.lock().unwrap();
    assert!(prompts[1].contains("SocialAI: Business: Acme, Platforms: Instagram"));
    // Rebuilt buffer starts from the context only
    assert!(!prompts[1].contains("User: hi"));

    drop(prompts);
    session.disconnect("Instagram");
    assert!(!session.assistant().is_ready());
}
