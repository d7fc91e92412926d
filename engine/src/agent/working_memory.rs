//! Working Memory for agent conversations
//!
//! Each agent keeps its own transcript: the system prompt first, then user
//! turns, assistant replies, tool calls and tool results. When the estimated
//! token count passes the configured limit the oldest turns are dropped,
//! keeping the system prompt and the most recent exchange.

use crate::llm::{Message, MessageRole};

/// Default context limit in tokens
const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Rough estimate: 1 token ≈ 4 characters
const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-message overhead for role and structure
const MESSAGE_OVERHEAD_TOKENS: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkingMemory {
    messages: Vec<Message>,
    context_limit: usize,
    token_count: usize,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CONTEXT_LIMIT)
    }

    pub fn with_limit(context_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            context_limit,
            token_count: 0,
        }
    }

    /// Memory seeded with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>, context_limit: usize) -> Self {
        let mut memory = Self::with_limit(context_limit);
        memory.add_message(Message::system(prompt));
        memory
    }

    /// Append a message, trimming old turns if the limit is exceeded
    pub fn add_message(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);

        if self.token_count > self.context_limit {
            self.trim_messages();
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn context_limit(&self) -> usize {
        self.context_limit
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_count = 0;
    }

    /// Drop the oldest non-system messages until under the limit.
    ///
    /// A tool result is never left at the head of the conversation without
    /// the assistant message that requested it; providers reject that shape.
    fn trim_messages(&mut self) {
        if self.messages.len() <= 3 {
            return;
        }

        let keep_head = usize::from(
            self.messages
                .first()
                .is_some_and(|m| m.role == MessageRole::System),
        );

        while self.token_count > self.context_limit && self.messages.len() > keep_head + 2 {
            self.remove_at(keep_head);
        }

        while self.messages.len() > keep_head + 1
            && self.messages[keep_head].role == MessageRole::Tool
        {
            self.remove_at(keep_head);
        }
    }

    fn remove_at(&mut self, index: usize) {
        let removed = self.messages.remove(index);
        self.token_count = self
            .token_count
            .saturating_sub(Self::estimate_tokens(&removed));
    }

    fn estimate_tokens(message: &Message) -> usize {
        let call_chars: usize = message
            .tool_calls
            .iter()
            .map(|tc| tc.name.len() + tc.arguments.len() + tc.id.len())
            .sum();
        let id_chars = message.tool_call_id.as_ref().map_or(0, |id| id.len());

        let total_chars = message.content.len() + call_chars + id_chars;
        total_chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;

    #[test]
    fn test_with_system_prompt() {
        let memory = WorkingMemory::with_system_prompt("You are the concierge", 4000);
        assert_eq!(memory.messages().len(), 1);
        assert_eq!(memory.messages()[0].role, MessageRole::System);
        assert_eq!(memory.context_limit(), 4000);
    }

    #[test]
    fn test_clear() {
        let mut memory = WorkingMemory::new();
        memory.add_message(Message::user("Hello"));
        memory.clear();
        assert!(memory.messages().is_empty());
        assert_eq!(memory.token_count(), 0);
    }

    #[test]
    fn test_tool_calls_count_towards_tokens() {
        let plain = WorkingMemory::estimate_tokens(&Message::assistant(""));
        let with_call = WorkingMemory::estimate_tokens(&Message::assistant_tool_calls(vec![
            ToolCall::new("call_1234567890", "generate_diagram", r#"{"description": "s3"}"#),
        ]));
        assert!(with_call > plain);
    }

    #[test]
    fn test_trimming_preserves_system_prompt_and_recent_turn() {
        let mut memory = WorkingMemory::with_system_prompt("System", 100);

        for i in 0..20 {
            memory.add_message(Message::user(format!("User {}", i)));
            memory.add_message(Message::assistant(format!("Assistant {}", i)));
        }

        let messages = memory.messages();
        assert_eq!(messages[0].content, "System");
        assert!(messages.last().unwrap().content.contains("Assistant 19"));
        assert!(memory.token_count() <= memory.context_limit());
    }

    #[test]
    fn test_trimming_never_orphans_tool_results() {
        let mut memory = WorkingMemory::with_system_prompt("System", 120);

        for i in 0..10 {
            memory.add_message(Message::user(format!("request {}", i)));
            memory.add_message(Message::assistant_tool_calls(vec![ToolCall::new(
                format!("c{}", i),
                "search_rag",
                "{}",
            )]));
            memory.add_message(Message::tool_result("passage", format!("c{}", i)));
            memory.add_message(Message::assistant(format!("answer {}", i)));
        }

        let messages = memory.messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert_ne!(messages[1].role, MessageRole::Tool);
    }

    #[test]
    fn test_no_trimming_with_few_messages() {
        let mut memory = WorkingMemory::with_limit(20);
        memory.add_message(Message::system("System prompt that is long enough"));
        memory.add_message(Message::user("Hello"));
        memory.add_message(Message::assistant("Hi"));
        assert_eq!(memory.messages().len(), 3);
    }
}
