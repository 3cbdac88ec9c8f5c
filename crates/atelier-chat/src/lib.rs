//! Conversational assistant for Atelier.
//!
//! Manages the chat session state machine, builds category-aware prompts,
//! dispatches them to a generative-language backend and turns backend
//! failures into canned replies so the conversation never stalls.

pub mod catalog;
pub mod completion;
pub mod error;
pub mod fallback;
pub mod prompt;
pub mod session;
pub mod store;

pub use catalog::{Catalog, CategoryConfig};
pub use completion::{CompletionBackend, CompletionClient, GeminiBackend, ScriptedBackend};
pub use error::{ChatError, CompletionError};
pub use fallback::FallbackResolver;
pub use prompt::PromptBuilder;
pub use session::{
    BeginTurn, ConversationView, IgnoreReason, PendingTurn, SessionController, SessionState,
    SubmitOutcome,
};
pub use store::ConversationStore;
