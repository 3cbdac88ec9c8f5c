//! Session controller: the user-facing chat state machine.
//!
//! States:
//! - Closed -> Idle (open a session, greeting seeded)
//! - Idle -> Awaiting (user turn accepted, completion in flight)
//! - Awaiting -> Idle (completion or fallback appended)
//! - any -> Closed (close; a late completion is discarded)
//!
//! Submissions while Awaiting are ignored rather than queued, so at most one
//! backend call is in flight per session.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use atelier_core::{Category, Message};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::completion::CompletionClient;
use crate::error::{ChatError, CompletionError};
use crate::fallback::FallbackResolver;
use crate::prompt::PromptBuilder;
use crate::store::ConversationStore;

/// Views buffered per subscriber before it starts lagging.
const UPDATE_CAPACITY: usize = 256;

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session is open.
    Closed,
    /// Session open, ready for a user turn.
    Idle,
    /// A completion call is in flight; new turns are ignored.
    Awaiting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "Closed"),
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Awaiting => write!(f, "Awaiting"),
        }
    }
}

/// Why a submission was dropped without changing any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Blank or whitespace-only text.
    Empty,
    /// A completion is already in flight.
    Busy,
}

/// Result of a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened.
    Ignored(IgnoreReason),
    /// The backend answered and its text was appended.
    Answered,
    /// The backend failed and a fallback reply was appended instead.
    Recovered(CompletionError),
    /// The session was closed or replaced before the completion arrived.
    Discarded,
}

/// Snapshot of the conversation handed to the UI layer after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub session_id: Uuid,
    pub category: Category,
    pub messages: Vec<Message>,
    pub pending: bool,
    /// Canned user turns, offered only until the first exchange.
    pub quick_questions: Vec<String>,
}

/// A user turn whose completion has not been applied yet.
#[derive(Debug)]
pub struct PendingTurn {
    session_id: Uuid,
    category: Category,
    prompt: String,
}

impl PendingTurn {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Prompt to send to the backend.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Result of [`SessionController::begin_turn`].
#[derive(Debug)]
pub enum BeginTurn {
    Started(PendingTurn),
    Ignored(IgnoreReason),
}

struct ActiveSession {
    id: Uuid,
    store: ConversationStore,
}

/// Orchestrates the store, prompt builder, completion client and fallback
/// resolver for a single client-local chat session.
pub struct SessionController {
    client: Arc<CompletionClient>,
    catalog: Arc<Catalog>,
    prompts: PromptBuilder,
    fallback: FallbackResolver,
    session: Mutex<Option<ActiveSession>>,
    updates: broadcast::Sender<Option<ConversationView>>,
}

impl SessionController {
    /// Create a controller with no open session.
    pub fn new(client: Arc<CompletionClient>, catalog: Arc<Catalog>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            client,
            prompts: PromptBuilder::new(Arc::clone(&catalog)),
            fallback: FallbackResolver::new(Arc::clone(&catalog)),
            catalog,
            session: Mutex::new(None),
            updates,
        }
    }

    /// Limit how many prior messages go into each prompt.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.prompts = self.prompts.with_history_window(window);
        self
    }

    /// Open a fresh session for `category`, destroying any existing one.
    pub fn open_session(&self, category: Category) -> Result<Uuid, ChatError> {
        let view = {
            let mut guard = self.lock()?;
            if let Some(previous) = guard.take() {
                tracing::info!(session_id = %previous.id, "Replacing open chat session");
            }
            let session = ActiveSession {
                id: Uuid::new_v4(),
                store: ConversationStore::seeded(Arc::clone(&self.catalog), category),
            };
            tracing::info!(session_id = %session.id, category = %category, "Chat session opened");
            let view = self.render(&session);
            *guard = Some(session);
            view
        };
        let id = view.session_id;
        self.publish(Some(view));
        Ok(id)
    }

    /// Destroy the open session. Returns whether one was open.
    pub fn close(&self) -> bool {
        let closed = match self.session.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => {
                tracing::error!("Session lock poisoned: {}", e);
                None
            }
        };
        match closed {
            Some(session) => {
                if session.store.pending() {
                    tracing::info!(
                        session_id = %session.id,
                        "Chat session closed with a completion in flight; its result will be discarded"
                    );
                } else {
                    tracing::info!(session_id = %session.id, "Chat session closed");
                }
                self.publish(None);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session.lock() {
            Ok(guard) => match guard.as_ref() {
                None => SessionState::Closed,
                Some(session) if session.store.pending() => SessionState::Awaiting,
                Some(_) => SessionState::Idle,
            },
            Err(_) => SessionState::Closed,
        }
    }

    /// Current snapshot, or `None` when closed.
    pub fn view(&self) -> Option<ConversationView> {
        self.session
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| self.render(s)))
    }

    /// Receive a view for every transition, in order (`None` once closed).
    pub fn subscribe(&self) -> broadcast::Receiver<Option<ConversationView>> {
        self.updates.subscribe()
    }

    /// Submit a free-text user turn and wait for the reply.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, ChatError> {
        self.dispatch(text)?.await
    }

    /// Start a turn right away and return a future that finishes it.
    ///
    /// The user message is recorded and the session is `Awaiting` before this
    /// returns, so a later submission is rejected even if the returned future
    /// has not been polled yet. Dropping the future recovers the turn with a
    /// fallback reply.
    pub fn dispatch(
        &self,
        text: &str,
    ) -> Result<impl Future<Output = Result<SubmitOutcome, ChatError>> + '_, ChatError> {
        let started = match self.begin_turn(text)? {
            BeginTurn::Started(turn) => Ok(InFlight {
                controller: self,
                turn: Some(turn),
            }),
            BeginTurn::Ignored(reason) => Err(reason),
        };

        Ok(async move {
            let in_flight = match started {
                Ok(in_flight) => in_flight,
                Err(reason) => return Ok(SubmitOutcome::Ignored(reason)),
            };
            let prompt = in_flight.prompt();
            let result = self.client.complete(&prompt).await;
            in_flight.finish(result)
        })
    }

    /// Tap one of the quick questions. Identical to submitting its text.
    pub async fn quick_question_tapped(&self, text: &str) -> Result<SubmitOutcome, ChatError> {
        self.submit(text).await
    }

    /// First half of a turn: record the user message and build the prompt.
    ///
    /// The caller must hand the backend's result to
    /// [`complete_turn`](Self::complete_turn), otherwise the session stays
    /// `Awaiting`.
    pub fn begin_turn(&self, text: &str) -> Result<BeginTurn, ChatError> {
        if text.trim().is_empty() {
            return Ok(BeginTurn::Ignored(IgnoreReason::Empty));
        }

        let (turn, view) = {
            let mut guard = self.lock()?;
            let session = guard.as_mut().ok_or_else(|| {
                ChatError::InvalidState("no chat session is open".to_string())
            })?;

            if session.store.pending() {
                tracing::warn!(
                    session_id = %session.id,
                    "Submission ignored while a completion is in flight"
                );
                return Ok(BeginTurn::Ignored(IgnoreReason::Busy));
            }

            let category = session.store.category().ok_or_else(|| {
                ChatError::InvalidState("conversation has no category".to_string())
            })?;
            let prompt = self.prompts.build(category, session.store.history(), text);

            session.store.append(Message::user(text))?;
            session.store.set_pending(true)?;
            tracing::debug!(
                session_id = %session.id,
                messages = session.store.len(),
                prompt_len = prompt.len(),
                "User turn accepted"
            );

            let turn = PendingTurn {
                session_id: session.id,
                category,
                prompt,
            };
            (turn, self.render(session))
        };

        self.publish(Some(view));
        Ok(BeginTurn::Started(turn))
    }

    /// Second half of a turn: append the completion, or the fallback reply
    /// on failure, and return to `Idle`.
    ///
    /// A turn belonging to a session that has since been closed or replaced
    /// is dropped without touching any state.
    pub fn complete_turn(
        &self,
        turn: PendingTurn,
        result: Result<String, CompletionError>,
    ) -> Result<SubmitOutcome, ChatError> {
        let (outcome, view) = {
            let mut guard = self.lock()?;
            let session = match guard.as_mut() {
                Some(session) if session.id == turn.session_id => session,
                _ => {
                    tracing::debug!(
                        session_id = %turn.session_id,
                        "Discarding completion for a session that is no longer open"
                    );
                    return Ok(SubmitOutcome::Discarded);
                }
            };

            let (outcome, reply) = match result {
                Ok(text) => (SubmitOutcome::Answered, text),
                Err(err) => {
                    tracing::warn!(
                        session_id = %session.id,
                        category = %turn.category,
                        error = %err,
                        "Completion failed, replying with fallback"
                    );
                    let reply = self.fallback.resolve(turn.category, &err);
                    (SubmitOutcome::Recovered(err), reply)
                }
            };

            session.store.append(Message::assistant(reply))?;
            session.store.set_pending(false)?;
            (outcome, self.render(session))
        };

        self.publish(Some(view));
        Ok(outcome)
    }

    fn publish(&self, view: Option<ConversationView>) {
        // no subscribers is fine
        let _ = self.updates.send(view);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<ActiveSession>>, ChatError> {
        self.session
            .lock()
            .map_err(|e| ChatError::InvalidState(format!("session lock poisoned: {}", e)))
    }

    fn render(&self, session: &ActiveSession) -> ConversationView {
        let category = session.store.category().unwrap_or_default();
        let quick_questions = if session.store.history().is_empty() {
            self.catalog.quick_questions(category).to_vec()
        } else {
            Vec::new()
        };
        ConversationView {
            session_id: session.id,
            category,
            messages: session.store.messages().to_vec(),
            pending: session.store.pending(),
            quick_questions,
        }
    }
}

/// Completes a turn whose future was dropped before the backend
/// answered, so the session returns to `Idle`.
struct InFlight<'a> {
    controller: &'a SessionController,
    turn: Option<PendingTurn>,
}

impl InFlight<'_> {
    fn prompt(&self) -> String {
        self.turn
            .as_ref()
            .map(|turn| turn.prompt.clone())
            .unwrap_or_default()
    }

    fn finish(
        mut self,
        result: Result<String, CompletionError>,
    ) -> Result<SubmitOutcome, ChatError> {
        match self.turn.take() {
            Some(turn) => self.controller.complete_turn(turn, result),
            None => Ok(SubmitOutcome::Discarded),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            let cancelled = Err(CompletionError::RequestFailed("turn cancelled".to_string()));
            if let Err(e) = self.controller.complete_turn(turn, cancelled) {
                tracing::error!(error = %e, "Failed to recover cancelled turn");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
