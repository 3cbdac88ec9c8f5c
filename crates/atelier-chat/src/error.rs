//! Error types for the conversational assistant.

use atelier_core::error::AtelierError;

/// Outcome of a failed completion call.
///
/// None of these reach the user directly: the session controller turns each
/// one into an assistant message through the fallback resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("completion request failed: {0}")]
    RequestFailed(String),
    #[error("backend returned an empty response")]
    EmptyResponse,
}

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error(transparent)]
    Core(#[from] AtelierError),
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        ChatError::Catalog(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_error_display() {
        let err = CompletionError::BackendUnavailable("GEMINI_API_KEY is not set".to_string());
        assert_eq!(
            err.to_string(),
            "backend unavailable: GEMINI_API_KEY is not set"
        );

        let err = CompletionError::RequestFailed("HTTP 503".to_string());
        assert_eq!(err.to_string(), "completion request failed: HTTP 503");

        let err = CompletionError::EmptyResponse;
        assert_eq!(err.to_string(), "backend returned an empty response");
    }

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::InvalidState("no open session".to_string());
        assert_eq!(err.to_string(), "invalid state: no open session");

        let err = ChatError::Catalog("missing greeting".to_string());
        assert_eq!(err.to_string(), "catalog error: missing greeting");
    }

    #[test]
    fn test_chat_error_from_atelier_error_is_transparent() {
        let core_err = AtelierError::UnknownCategory("gala".to_string());
        let chat_err: ChatError = core_err.into();
        assert!(matches!(chat_err, ChatError::Core(_)));
        assert_eq!(chat_err.to_string(), "Unknown event category: gala");
    }

    #[test]
    fn test_chat_error_from_toml() {
        let err: Result<toml::Value, _> = toml::from_str("[[[");
        let chat_err: ChatError = err.unwrap_err().into();
        assert!(matches!(chat_err, ChatError::Catalog(_)));
    }

    #[test]
    fn test_completion_error_is_comparable() {
        assert_eq!(CompletionError::EmptyResponse, CompletionError::EmptyResponse);
        assert_ne!(
            CompletionError::RequestFailed("a".into()),
            CompletionError::RequestFailed("b".into())
        );
    }
}
