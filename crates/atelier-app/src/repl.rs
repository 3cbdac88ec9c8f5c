//! Line-oriented input handling and transcript rendering.

use std::future::Future;
use std::pin::Pin;

use atelier_chat::{ChatError, ConversationView, IgnoreReason, SessionController, SubmitOutcome};
use atelier_core::{Category, Role};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use uuid::Uuid;

pub const HELP: &str = "\
Type a message and press Enter to ask the assistant.
  /quick <n>         ask the n-th quick question
  /category <name>   start over with wedding, party, corporate or casual
  /close             end the session and exit
  /help              show this help";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Quick(usize),
    Category(Category),
    Close,
    Help,
    Invalid(String),
}

/// Parse a raw input line. Anything not starting with `/` is a message.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).unwrap_or("");

    match name {
        "quick" | "q" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Quick(n),
            _ => Command::Invalid("usage: /quick <n> (1-based)".to_string()),
        },
        "category" | "c" => match arg.parse::<Category>() {
            Ok(category) => Command::Category(category),
            Err(e) => Command::Invalid(e.to_string()),
        },
        "close" | "quit" | "exit" => Command::Close,
        "help" | "?" => Command::Help,
        other => Command::Invalid(format!("unknown command: /{}", other)),
    }
}

/// A turn whose reply has not arrived yet.
type Turn<'a> = Pin<Box<dyn Future<Output = Result<SubmitOutcome, ChatError>> + 'a>>;

/// Report outcomes the transcript itself does not show.
fn report(result: Result<SubmitOutcome, ChatError>) {
    match result {
        Ok(SubmitOutcome::Ignored(IgnoreReason::Busy)) => {
            eprintln!("Still waiting for the assistant, try again in a moment.");
        }
        Ok(SubmitOutcome::Recovered(e)) => {
            tracing::debug!(error = %e, "Turn answered with fallback");
        }
        Ok(_) => {}
        Err(e) => eprintln!("{}", e),
    }
}

/// Start a turn, or settle it at once when another one is still in flight.
async fn start_turn<'a, F>(
    in_flight: &mut Option<Turn<'a>>,
    dispatched: Result<F, ChatError>,
) where
    F: Future<Output = Result<SubmitOutcome, ChatError>> + 'a,
{
    match dispatched {
        // the session is Awaiting, so this resolves without a backend call
        Ok(turn) if in_flight.is_some() => report(turn.await),
        Ok(turn) => *in_flight = Some(Box::pin(turn)),
        Err(e) => report(Err(e)),
    }
}

/// Feed input lines to the session until `/close` or end of input.
///
/// The pending reply is awaited alongside the input, so lines typed while
/// the assistant is answering are rejected rather than queued, and `/close`
/// takes effect immediately. At end of input the pending reply is still
/// awaited.
pub async fn run<R>(controller: &SessionController, input: R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut in_flight: Option<Turn<'_>> = None;

    loop {
        tokio::select! {
            result = async {
                match in_flight.as_mut() {
                    Some(turn) => turn.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                report(result);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    if let Some(turn) = in_flight.take() {
                        report(turn.await);
                    }
                    return Ok(());
                };
                match parse_command(&line) {
                    Command::Say(text) => {
                        start_turn(&mut in_flight, controller.dispatch(&text)).await;
                    }
                    Command::Quick(n) => {
                        let question = controller
                            .view()
                            .and_then(|view| view.quick_questions.get(n - 1).cloned());
                        match question {
                            Some(question) => {
                                start_turn(&mut in_flight, controller.dispatch(&question)).await;
                            }
                            None => eprintln!("No quick question #{} available.", n),
                        }
                    }
                    Command::Category(category) => {
                        if let Err(e) = controller.open_session(category) {
                            eprintln!("{}", e);
                        }
                        // the old turn belongs to the replaced session
                        in_flight = None;
                    }
                    Command::Close => {
                        controller.close();
                        return Ok(());
                    }
                    Command::Help => println!("{}", HELP),
                    Command::Invalid(message) => eprintln!("{}", message),
                }
            }
        }
    }
}

/// Turns successive views into transcript lines, printing only what changed.
#[derive(Debug, Default)]
pub struct Renderer {
    json: bool,
    session: Option<Uuid>,
    shown: usize,
    pending_shown: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn render(&mut self, view: Option<&ConversationView>) -> Vec<String> {
        if self.json {
            return match serde_json::to_string(&view) {
                Ok(line) => vec![line],
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize conversation view");
                    Vec::new()
                }
            };
        }

        let Some(view) = view else {
            let lines = if self.session.take().is_some() {
                vec!["Session closed.".to_string()]
            } else {
                Vec::new()
            };
            self.shown = 0;
            self.pending_shown = false;
            return lines;
        };

        let mut lines = Vec::new();
        if self.session != Some(view.session_id) {
            self.session = Some(view.session_id);
            self.shown = 0;
            self.pending_shown = false;
            lines.push(format!("--- {} consultation ---", view.category));
        }

        for message in view.messages.iter().skip(self.shown) {
            let speaker = match message.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            lines.push(format!("{}: {}", speaker, message.text));
        }
        self.shown = view.messages.len();

        if !view.quick_questions.is_empty() && view.messages.len() == 1 {
            lines.push("Quick questions:".to_string());
            for (i, question) in view.quick_questions.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, question));
            }
        }

        if view.pending && !self.pending_shown {
            lines.push("assistant is typing...".to_string());
        }
        self.pending_shown = view.pending;

        lines
    }
}
