//! Canned replies for degraded backend service.

use std::sync::Arc;

use atelier_core::Category;

use crate::catalog::Catalog;
use crate::error::CompletionError;

/// Reply used when no backend client could be constructed at all.
pub const UNASSISTED_MESSAGE: &str = "Our AI stylist isn't available right now, but we can \
    keep going together. Tell me about your event, the style you like, and your budget, and \
    I'll note everything for a personalized requirement form.";

/// Reply used when the category has no usable catalog entry.
pub const GENERIC_APOLOGY: &str = "Sorry, I couldn't come up with an answer just now. \
    Could you try asking that again in a moment?";

/// Maps a completion failure to the assistant message shown instead.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    catalog: Arc<Catalog>,
}

impl FallbackResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Resolve the fallback reply. Never returns an empty string.
    pub fn resolve(&self, category: Category, error: &CompletionError) -> String {
        match error {
            CompletionError::BackendUnavailable(_) => UNASSISTED_MESSAGE.to_string(),
            CompletionError::RequestFailed(_) | CompletionError::EmptyResponse => self
                .catalog
                .get(category)
                .map(|entry| entry.fallback.trim())
                .filter(|text| !text.is_empty())
                .unwrap_or(GENERIC_APOLOGY)
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryConfig;

    fn all_errors() -> Vec<CompletionError> {
        vec![
            CompletionError::BackendUnavailable("no key".to_string()),
            CompletionError::RequestFailed("timeout".to_string()),
            CompletionError::EmptyResponse,
        ]
    }

    #[test]
    fn test_resolve_is_total_and_deterministic() {
        let resolver = FallbackResolver::new(Arc::new(Catalog::builtin()));
        for category in Category::ALL {
            for error in all_errors() {
                let first = resolver.resolve(category, &error);
                let second = resolver.resolve(category, &error);
                assert!(!first.is_empty());
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_request_failed_uses_category_text() {
        let catalog = Arc::new(Catalog::builtin());
        let resolver = FallbackResolver::new(Arc::clone(&catalog));
        let text = resolver.resolve(
            Category::Wedding,
            &CompletionError::RequestFailed("503".to_string()),
        );
        assert_eq!(text, catalog.get(Category::Wedding).unwrap().fallback);
        assert!(text.contains("wedding"));
    }

    #[test]
    fn test_empty_response_matches_request_failed() {
        let resolver = FallbackResolver::new(Arc::new(Catalog::builtin()));
        for category in Category::ALL {
            assert_eq!(
                resolver.resolve(category, &CompletionError::EmptyResponse),
                resolver.resolve(category, &CompletionError::RequestFailed("x".to_string()))
            );
        }
    }

    #[test]
    fn test_fallback_texts_differ_per_category() {
        let resolver = FallbackResolver::new(Arc::new(Catalog::builtin()));
        let err = CompletionError::EmptyResponse;
        let party = resolver.resolve(Category::Party, &err);
        let corporate = resolver.resolve(Category::Corporate, &err);
        assert_ne!(party, corporate);
    }

    #[test]
    fn test_backend_unavailable_is_generic() {
        let resolver = FallbackResolver::new(Arc::new(Catalog::builtin()));
        let err = CompletionError::BackendUnavailable("missing credential".to_string());
        for category in Category::ALL {
            assert_eq!(resolver.resolve(category, &err), UNASSISTED_MESSAGE);
        }
    }

    #[test]
    fn test_missing_entry_returns_apology() {
        let resolver = FallbackResolver::new(Arc::new(Catalog::empty()));
        let text = resolver.resolve(Category::Casual, &CompletionError::EmptyResponse);
        assert_eq!(text, GENERIC_APOLOGY);
    }

    #[test]
    fn test_blank_catalog_fallback_returns_apology() {
        let mut catalog = Catalog::empty();
        catalog.insert(
            Category::Party,
            CategoryConfig {
                greeting: "Hi".to_string(),
                instructions: "x".to_string(),
                quick_questions: vec![],
                fallback: "   ".to_string(),
                max_words: 50,
            },
        );
        let resolver = FallbackResolver::new(Arc::new(catalog));
        let text = resolver.resolve(Category::Party, &CompletionError::RequestFailed("x".into()));
        assert_eq!(text, GENERIC_APOLOGY);
    }
}
