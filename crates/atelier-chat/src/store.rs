//! Append-only conversation log.
//!
//! The store owns the message sequence and the in-flight flag of a single
//! session. It performs no I/O.

use std::sync::Arc;

use atelier_core::{Category, Message};

use crate::catalog::Catalog;
use crate::error::ChatError;

/// Ordered message log for one session, seeded with a greeting.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    catalog: Arc<Catalog>,
    category: Option<Category>,
    messages: Vec<Message>,
    pending: bool,
}

impl ConversationStore {
    /// Create an unseeded store. Mutations fail until [`reset`](Self::reset)
    /// has been called.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            category: None,
            messages: Vec::new(),
            pending: false,
        }
    }

    /// Create a store already seeded for `category`.
    pub fn seeded(catalog: Arc<Catalog>, category: Category) -> Self {
        let mut store = Self::new(catalog);
        store.reset(category);
        store
    }

    /// Drop every message, seed the greeting for `category` and clear the
    /// in-flight flag.
    pub fn reset(&mut self, category: Category) {
        let greeting = self.catalog.greeting(category);
        self.messages.clear();
        self.messages.push(Message::assistant(greeting));
        self.category = Some(category);
        self.pending = false;
    }

    /// Append a message at the end of the log.
    pub fn append(&mut self, message: Message) -> Result<(), ChatError> {
        self.ensure_initialized("append")?;
        self.messages.push(message);
        Ok(())
    }

    /// Toggle the in-flight flag.
    ///
    /// Raising the flag while it is already raised means two backend calls
    /// would overlap, which is rejected.
    pub fn set_pending(&mut self, pending: bool) -> Result<(), ChatError> {
        self.ensure_initialized("set_pending")?;
        if pending && self.pending {
            return Err(ChatError::InvalidState(
                "a completion is already in flight for this conversation".to_string(),
            ));
        }
        self.pending = pending;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.category.is_some()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Every message, greeting first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages after the synthesized greeting.
    pub fn history(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn ensure_initialized(&self, op: &str) -> Result<(), ChatError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ChatError::InvalidState(format!(
                "{} called before the conversation was seeded",
                op
            )))
        }
    }
}
