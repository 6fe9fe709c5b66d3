//! LLM assistant primed with the operator's business context.
//!
//! The context is a single synthetic turn at the head of the conversation
//! buffer: `Business: <name>, Platforms: <connected platforms>`. Changing the
//! connections or the business profile invalidates the handle, and the next
//! message rebuilds it from live session state.
//!
//! # Handle lifecycle
//!
//! ```text
//!   Uninitialized ──(first message / after invalidation)──▶ Ready
//!        ▲                                                    │
//!        └──────────(connections or profile change)───────────┘
//! ```
//!
//! A failed construction leaves the handle `Uninitialized`; the next message
//! retries from scratch.

mod memory;
mod provider;

pub use memory::ConversationMemory;
pub use provider::{ChatProvider, ChatProviderFactory, GeminiProvider, GeminiProviderFactory};

use crate::oauth::PlatformId;
use crate::session::{BusinessProfile, ChatMessage, NoticeLevel, Role, SessionState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Label shown for the memory strategy in the dashboard status block
pub const MEMORY_TYPE: &str = "Buffer";

/// A ready assistant: provider plus conversation buffer
pub struct Conversation {
    provider: Arc<dyn ChatProvider>,
    memory: ConversationMemory,
}

impl Conversation {
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

/// Per-session assistant handle
#[derive(Default)]
pub enum AssistantHandle {
    #[default]
    Uninitialized,
    Ready(Conversation),
}

impl AssistantHandle {
    /// Drop the conversation so the next use rebuilds the context
    pub fn invalidate(&mut self) {
        if self.is_ready() {
            debug!("Assistant context invalidated");
        }
        *self = AssistantHandle::Uninitialized;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AssistantHandle::Ready(_))
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        match self {
            AssistantHandle::Ready(conversation) => Some(conversation),
            AssistantHandle::Uninitialized => None,
        }
    }
}

/// Chat errors reported to the caller (provider failures are not errors;
/// they become assistant messages)
#[derive(Debug, PartialEq, Clone)]
pub enum ChatError {
    /// Message was empty or whitespace only
    EmptyMessage,
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EmptyMessage => write!(f, "Message must not be empty"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Context line injected as the assistant's first turn
pub fn build_context<'a>(
    business: &BusinessProfile,
    platforms: impl IntoIterator<Item = &'a PlatformId>,
) -> String {
    let platforms: Vec<&str> = platforms.into_iter().map(PlatformId::as_str).collect();
    let platforms = if platforms.is_empty() {
        "None".to_string()
    } else {
        platforms.join(", ")
    };
    let name = if business.name.is_empty() {
        "Not provided"
    } else {
        business.name.as_str()
    };
    format!("Business: {}, Platforms: {}", name, platforms)
}

/// Context for the session's current connections and profile
pub fn session_context(session: &SessionState) -> String {
    build_context(session.business_info(), session.connected_platforms())
}

/// Make the handle ready, building a fresh conversation if needed
pub fn ensure_ready(
    session: &mut SessionState,
    factory: &dyn ChatProviderFactory,
) -> anyhow::Result<()> {
    if session.assistant.is_ready() {
        return Ok(());
    }

    let context = session_context(session);
    let provider = factory.build()?;
    info!(model = provider.model(), "Assistant initialized");
    session.assistant = AssistantHandle::Ready(Conversation {
        provider,
        memory: ConversationMemory::with_context(&context),
    });
    Ok(())
}

/// Append the user's message, ask the provider, append the reply.
///
/// Returns the messages appended to the transcript (user turn first). A
/// provider or initialization failure is recorded as an assistant message so
/// the user's turn is never lost.
pub async fn send_message(
    session: &mut SessionState,
    factory: &dyn ChatProviderFactory,
    text: &str,
) -> Result<Vec<ChatMessage>, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let user_message = ChatMessage::new(Role::User, text);
    session.append_message(user_message.clone());

    let reply = match ask(session, factory, text).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Assistant call failed");
            format!("Sorry, I encountered an error: {}", e)
        }
    };

    let assistant_message = ChatMessage::new(Role::Assistant, reply);
    session.append_message(assistant_message.clone());

    Ok(vec![user_message, assistant_message])
}

async fn ask(
    session: &mut SessionState,
    factory: &dyn ChatProviderFactory,
    input: &str,
) -> anyhow::Result<String> {
    if let Err(e) = ensure_ready(session, factory) {
        session.push_notice(
            NoticeLevel::Error,
            format!("Error initializing chatbot: {}", e),
        );
        return Err(e);
    }

    let (provider, prompt) = match &session.assistant {
        AssistantHandle::Ready(conversation) => (
            Arc::clone(&conversation.provider),
            conversation.memory.render_prompt(input),
        ),
        AssistantHandle::Uninitialized => {
            return Err(anyhow::anyhow!("Assistant is not initialized"))
        }
    };

    let reply = provider.complete(&prompt).await?;

    if let AssistantHandle::Ready(conversation) = &mut session.assistant {
        conversation.memory.save(input.to_string(), reply.clone());
    }

    Ok(reply)
}
