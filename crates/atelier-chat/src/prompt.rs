//! Prompt construction.
//!
//! Turns the category, the conversation so far and the new user turn into the
//! single prompt string handed to the completion backend. Rebuilt on every
//! call.

use std::sync::Arc;

use atelier_core::{Category, Message};

use crate::catalog::Catalog;

/// First line of every prompt, followed by the category name.
pub const CATEGORY_HEADER: &str = "Event category: ";

const GENERIC_INSTRUCTIONS: &str = "You are a friendly attire consultant helping a customer \
    find the right outfit for their event.";

const DEFAULT_MAX_WORDS: u32 = 100;

/// Builds backend prompts from catalog content and conversation history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    catalog: Arc<Catalog>,
    history_window: Option<usize>,
}

impl PromptBuilder {
    /// Builder that serializes the whole conversation.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            history_window: None,
        }
    }

    /// Only serialize the last `window` prior messages. `None` keeps all.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window;
        self
    }

    /// Build the prompt for `user_turn`.
    ///
    /// `prior` must not include the synthesized greeting or the new turn
    /// itself.
    pub fn build(&self, category: Category, prior: &[Message], user_turn: &str) -> String {
        let (instructions, max_words) = match self.catalog.get(category) {
            Some(entry) => (entry.instructions.as_str(), entry.max_words),
            None => (GENERIC_INSTRUCTIONS, DEFAULT_MAX_WORDS),
        };

        let prior = match self.history_window {
            Some(window) => &prior[prior.len().saturating_sub(window)..],
            None => prior,
        };

        let mut prompt = String::new();
        prompt.push_str(CATEGORY_HEADER);
        prompt.push_str(category.as_str());
        prompt.push('\n');
        prompt.push_str(instructions);
        prompt.push_str("\n\nConversation:\n");
        for message in prior {
            prompt.push_str(&format!("{}: {}\n", message.role, message.text));
        }
        prompt.push_str(&format!("user: {}\n\n", user_turn));
        prompt.push_str(&format!(
            "Reply to the last user message in at most {} words. Keep the tone \
             conversational, stay focused on attire for this {} event, and end with one \
             follow-up question that helps gather the customer's requirements.\n",
            max_words, category
        ));
        prompt.push_str("assistant:");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Arc::new(Catalog::builtin()))
    }

    #[test]
    fn test_build_first_turn() {
        let prompt = builder().build(Category::Wedding, &[], "What's your budget?");
        assert!(prompt.starts_with("Event category: wedding\n"));
        assert!(prompt.contains("bridal"));
        assert!(prompt.contains("user: What's your budget?\n"));
        assert!(prompt.contains("at most 120 words"));
        assert!(prompt.contains("follow-up question"));
        assert!(prompt.ends_with("assistant:"));
    }

    #[test]
    fn test_build_serializes_history_in_order() {
        let prior = vec![
            Message::user("Indoor or outdoor ceremony?"),
            Message::assistant("Which do you prefer?"),
            Message::user("Outdoor"),
            Message::assistant("Lovely."),
        ];
        let prompt = builder().build(Category::Wedding, &prior, "Any colour ideas?");

        let lines: Vec<&str> = prompt
            .lines()
            .filter(|l| l.starts_with("user: ") || l.starts_with("assistant: "))
            .collect();
        assert_eq!(
            lines,
            vec![
                "user: Indoor or outdoor ceremony?",
                "assistant: Which do you prefer?",
                "user: Outdoor",
                "assistant: Lovely.",
                "user: Any colour ideas?",
            ]
        );
    }

    #[test]
    fn test_build_does_not_include_greeting() {
        let catalog = Arc::new(Catalog::builtin());
        let greeting = catalog.greeting(Category::Party);
        let prompt = PromptBuilder::new(catalog).build(Category::Party, &[], "Hi");
        assert!(!prompt.contains(&greeting));
    }

    #[test]
    fn test_build_is_deterministic() {
        let prior = vec![Message::user("a"), Message::assistant("b")];
        let b = builder();
        assert_eq!(
            b.build(Category::Corporate, &prior, "c"),
            b.build(Category::Corporate, &prior, "c")
        );
    }

    #[test]
    fn test_build_uses_category_specific_block() {
        let b = builder();
        let corporate = b.build(Category::Corporate, &[], "hello");
        let casual = b.build(Category::Casual, &[], "hello");
        assert!(corporate.contains("corporate image consultant"));
        assert!(casual.contains("everyday-style advisor"));
        assert_ne!(corporate, casual);
    }

    #[test]
    fn test_build_without_window_keeps_long_history() {
        let prior: Vec<Message> = (0..200).map(|i| Message::user(format!("turn {}", i))).collect();
        let prompt = builder().build(Category::Casual, &prior, "last");
        assert!(prompt.contains("user: turn 0\n"));
        assert!(prompt.contains("user: turn 199\n"));
    }

    #[test]
    fn test_build_with_history_window() {
        let prior: Vec<Message> = (0..6).map(|i| Message::user(format!("turn {}", i))).collect();
        let prompt = builder()
            .with_history_window(Some(2))
            .build(Category::Casual, &prior, "last");
        assert!(!prompt.contains("turn 3\n"));
        assert!(prompt.contains("user: turn 4\n"));
        assert!(prompt.contains("user: turn 5\n"));
        assert!(prompt.contains("user: last\n"));
    }

    #[test]
    fn test_build_window_larger_than_history() {
        let prior = vec![Message::user("only")];
        let prompt = builder()
            .with_history_window(Some(10))
            .build(Category::Party, &prior, "next");
        assert!(prompt.contains("user: only\n"));
    }

    #[test]
    fn test_build_missing_catalog_entry_is_total() {
        let prompt = PromptBuilder::new(Arc::new(Catalog::empty())).build(
            Category::Party,
            &[],
            "hello",
        );
        assert!(prompt.contains("attire consultant"));
        assert!(prompt.contains("at most 100 words"));
    }
}
