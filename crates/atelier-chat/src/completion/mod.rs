//! Completion client and backend trait.
//!
//! The client is constructed once per process from configuration and injected
//! into the session controller. Each call is a single attempt raced against
//! the configured timeout; retries are never performed here.

pub mod gemini;
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use atelier_core::config::{BackendConfig, BackendProvider};

use crate::error::CompletionError;

pub use gemini::GeminiBackend;
pub use scripted::ScriptedBackend;

/// A generative-language backend: prompt in, completion text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Release backend resources.
    async fn shutdown(&self) {}
}

/// Wraps a backend and normalizes its failures into [`CompletionError`].
#[derive(Clone)]
pub struct CompletionClient {
    backend: Result<Arc<dyn CompletionBackend>, String>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("backend", &self.backend_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CompletionClient {
    /// Construct the backend selected by `config`.
    ///
    /// Fails with [`CompletionError::BackendUnavailable`] when the backend
    /// cannot be built, e.g. because its API key is missing.
    pub fn init(config: &BackendConfig) -> Result<Self, CompletionError> {
        let backend: Arc<dyn CompletionBackend> = match config.provider {
            BackendProvider::Gemini => Arc::new(GeminiBackend::from_config(config)?),
            BackendProvider::Scripted => Arc::new(ScriptedBackend::new(Duration::from_millis(
                config.scripted_delay_ms,
            ))),
        };
        let timeout = match config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        tracing::info!(
            backend = backend.name(),
            timeout_secs = config.timeout_secs,
            "Completion client initialized"
        );
        Ok(Self::with_backend(backend, timeout))
    }

    /// Client around an already constructed backend.
    pub fn with_backend(backend: Arc<dyn CompletionBackend>, timeout: Option<Duration>) -> Self {
        Self {
            backend: Ok(backend),
            timeout,
        }
    }

    /// Client with no backend. Every call fails with `BackendUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: Err(reason.into()),
            timeout: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_ok()
    }

    pub fn backend_name(&self) -> &str {
        match &self.backend {
            Ok(backend) => backend.name(),
            Err(_) => "unavailable",
        }
    }

    /// Issue one completion call.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let backend = match &self.backend {
            Ok(backend) => backend,
            Err(reason) => return Err(CompletionError::BackendUnavailable(reason.clone())),
        };

        let call = backend.generate(prompt);
        let text = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(CompletionError::RequestFailed(format!(
                        "timed out after {} ms",
                        limit.as_millis()
                    )))
                }
            },
            None => call.await?,
        };

        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text.trim().to_string())
    }

    /// Release the backend.
    pub async fn shutdown(&self) {
        if let Ok(backend) = &self.backend {
            backend.shutdown().await;
            tracing::info!(backend = backend.name(), "Completion client shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        reply: Result<String, CompletionError>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(reply: Result<String, CompletionError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl CompletionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_complete_success_trims_text() {
        let client = CompletionClient::with_backend(
            FixedBackend::new(Ok("  Try a linen suit.\n".to_string())),
            None,
        );
        assert_eq!(client.complete("p").await.unwrap(), "Try a linen suit.");
    }

    #[tokio::test]
    async fn test_complete_blank_is_empty_response() {
        let client =
            CompletionClient::with_backend(FixedBackend::new(Ok(" \n\t ".to_string())), None);
        assert_eq!(
            client.complete("p").await,
            Err(CompletionError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn test_complete_propagates_backend_error_without_retry() {
        let backend = FixedBackend::new(Err(CompletionError::RequestFailed("503".to_string())));
        let client = CompletionClient::with_backend(backend.clone(), None);
        assert_eq!(
            client.complete("p").await,
            Err(CompletionError::RequestFailed("503".to_string()))
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_client() {
        let client = CompletionClient::unavailable("GEMINI_API_KEY is not set");
        assert!(!client.is_available());
        assert_eq!(client.backend_name(), "unavailable");
        assert!(matches!(
            client.complete("p").await,
            Err(CompletionError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_request_failed() {
        let client =
            CompletionClient::with_backend(Arc::new(SlowBackend), Some(Duration::from_millis(20)));
        let result = client.complete("p").await;
        match result {
            Err(CompletionError::RequestFailed(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_init_scripted_backend() {
        let config = BackendConfig {
            provider: BackendProvider::Scripted,
            scripted_delay_ms: 0,
            ..BackendConfig::default()
        };
        let client = CompletionClient::init(&config).unwrap();
        assert!(client.is_available());
        assert_eq!(client.backend_name(), "scripted");
        client.shutdown().await;
    }

    #[test]
    fn test_init_gemini_without_key_is_unavailable() {
        let config = BackendConfig {
            provider: BackendProvider::Gemini,
            api_key_env: "ATELIER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..BackendConfig::default()
        };
        let result = CompletionClient::init(&config);
        assert!(matches!(
            result,
            Err(CompletionError::BackendUnavailable(_))
        ));
    }
}
