//! Conversation buffer and prompt rendering.

const HUMAN_PREFIX: &str = "User";
const AI_PREFIX: &str = "SocialAI";

const PERSONA: &str = "You are SocialAI, an expert social media strategist. You help users with:
- Content creation ideas
- Platform-specific strategies
- Audience engagement techniques
- Analytics interpretation";

/// One input/output exchange
#[derive(Clone, Debug, PartialEq)]
struct Turn {
    input: String,
    output: String,
}

/// Unbounded buffer of prior exchanges.
///
/// Nothing is summarized or evicted; context-window limits are left to the
/// provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    /// Buffer whose only entry is the synthetic context turn
    pub fn with_context(context: &str) -> Self {
        let mut memory = Self::default();
        memory.save(String::new(), context.to_string());
        memory
    }

    pub fn save(&mut self, input: String, output: String) {
        self.turns.push(Turn { input, output });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the buffer as prefixed lines. Turns with empty input (the
    /// context turn) render only their output line.
    pub fn render_history(&self) -> String {
        let mut lines = Vec::with_capacity(self.turns.len() * 2);
        for turn in &self.turns {
            if !turn.input.is_empty() {
                lines.push(format!("{}: {}", HUMAN_PREFIX, turn.input));
            }
            lines.push(format!("{}: {}", AI_PREFIX, turn.output));
        }
        lines.join("\n")
    }

    /// Full prompt for the next `input`
    pub fn render_prompt(&self, input: &str) -> String {
        format!(
            "{}\n\nConversation History:\n{}\n\nCurrent Interaction:\n{}: {}\n{}:",
            PERSONA,
            self.render_history(),
            HUMAN_PREFIX,
            input,
            AI_PREFIX
        )
    }
}
