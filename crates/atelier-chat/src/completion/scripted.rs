//! Offline keyword responder.
//!
//! Answers without any network access by matching keywords anywhere in the
//! latest user turn, case-insensitively. Used for demos and when no API key is configured for the real
//! backend.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use atelier_core::Category;
use regex::Regex;

use super::CompletionBackend;
use crate::error::CompletionError;
use crate::prompt::CATEGORY_HEADER;

const GENERIC_REPLY: &str = "That's helpful information! Based on what you've shared, I can \
    create a personalized requirement form. Would you like me to generate a detailed form with \
    your preferences, or do you have more specific questions about styles and options?";

struct Rule {
    pattern: &'static str,
    reply: &'static str,
}

const WEDDING_RULES: &[Rule] = &[
    Rule {
        pattern: r"date|when",
        reply: "Great! Knowing your wedding date helps me recommend seasonal appropriate \
            attire. Do you have a specific style in mind - classic, modern, bohemian, or vintage?",
    },
    Rule {
        pattern: r"style|classic|modern",
        reply: "Excellent choice! For the bride, are you looking for a traditional gown, \
            something more contemporary, or perhaps a fusion style? And for the groom, would \
            you prefer a classic tuxedo or a more modern suit?",
    },
    Rule {
        pattern: r"budget",
        reply: "Understanding your budget helps me find the best options. I can work with any \
            range. Would you also like me to coordinate matching accessories and styling for \
            both bride and groom?",
    },
    Rule {
        pattern: r"indoor|outdoor",
        reply: "Perfect! The venue type definitely influences the style recommendations. Would \
            you like me to create a complete requirement form based on our conversation so far?",
    },
];

fn wedding_patterns() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        WEDDING_RULES
            .iter()
            .filter_map(|rule| {
                Regex::new(&format!("(?i){}", rule.pattern))
                    .ok()
                    .map(|re| (re, rule.reply))
            })
            .collect()
    })
}

/// Backend that replies from a fixed rule table after an artificial delay.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    delay: Duration,
}

impl ScriptedBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pick the reply for a prompt built by [`crate::PromptBuilder`].
    pub fn reply_for(prompt: &str) -> &'static str {
        let category = prompt
            .lines()
            .next()
            .and_then(|line| line.strip_prefix(CATEGORY_HEADER))
            .and_then(|name| name.parse::<Category>().ok());
        let user_turn = prompt
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix("user: "))
            .unwrap_or("");

        if category == Some(Category::Wedding) {
            if let Some((_, reply)) = wedding_patterns()
                .iter()
                .find(|(re, _)| re.is_match(user_turn))
            {
                return *reply;
            }
        }
        GENERIC_REPLY
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Self::reply_for(prompt).to_string())
    }
}
