//! Per-category content table.
//!
//! Greeting, prompt instructions, quick questions and fallback copy live here
//! as data, so adding or rewording a category never touches the controller.
//! The built-in table can be overridden per category from a TOML file:
//!
//! ```toml
//! [wedding]
//! greeting = "Hello! Let's plan your wedding look."
//! instructions = "You are a bridal stylist..."
//! quick_questions = ["What's your wedding date?"]
//! fallback = "Our stylist is busy, tell me more about your day."
//! max_words = 100
//! ```

use std::collections::HashMap;
use std::path::Path;

use atelier_core::Category;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChatError;

/// Content attached to a single event category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// First assistant message of every session.
    pub greeting: String,
    /// Persona, tone and domain knowledge handed to the backend.
    pub instructions: String,
    /// Canned user turns offered before the first exchange.
    #[serde(default)]
    pub quick_questions: Vec<String>,
    /// Assistant reply used when the backend call fails.
    pub fallback: String,
    /// Word ceiling the backend is asked to respect.
    #[serde(default = "default_max_words")]
    pub max_words: u32,
}

fn default_max_words() -> u32 {
    100
}

/// Lookup table from category to its content.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<Category, CategoryConfig>,
}

impl Catalog {
    /// Catalog with no entries. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog covering all four categories.
    pub fn builtin() -> Self {
        let entries = Category::ALL
            .into_iter()
            .map(|category| (category, builtin_entry(category)))
            .collect();
        Self { entries }
    }

    /// Load category overrides from a TOML file on top of the built-in table.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let content = std::fs::read_to_string(path).map_err(atelier_core::AtelierError::from)?;
        let overrides: HashMap<String, CategoryConfig> = toml::from_str(&content)?;

        let mut catalog = Self::builtin();
        for (name, config) in overrides {
            let category: Category = name.parse()?;
            if config.greeting.trim().is_empty() {
                return Err(ChatError::Catalog(format!(
                    "{} entry has an empty greeting",
                    category
                )));
            }
            catalog.insert(category, config);
        }
        info!(path = %path.display(), "Category catalog loaded");
        Ok(catalog)
    }

    /// Load overrides if a path is given, falling back to the built-in table
    /// when the file is missing or invalid.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(
                    "Failed to load catalog from {}: {}. Using built-in catalog.",
                    path.display(),
                    e
                );
                Self::builtin()
            }
        }
    }

    pub fn insert(&mut self, category: Category, config: CategoryConfig) {
        self.entries.insert(category, config);
    }

    pub fn get(&self, category: Category) -> Option<&CategoryConfig> {
        self.entries.get(&category)
    }

    /// Greeting for `category`, or a neutral one if the catalog has no entry.
    pub fn greeting(&self, category: Category) -> String {
        match self.get(category) {
            Some(entry) => entry.greeting.clone(),
            None => format!(
                "Hi! I'm your AI assistant for {} requirements. How can I help you today?",
                category
            ),
        }
    }

    pub fn quick_questions(&self, category: Category) -> &[String] {
        self.get(category)
            .map(|entry| entry.quick_questions.as_slice())
            .unwrap_or(&[])
    }
}

fn greeting_for(category: Category) -> String {
    format!(
        "Hi! I'm your AI assistant for {} requirements. I'm here to help you find the \
         perfect attire. What kind of event are you planning for?",
        category
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_entry(category: Category) -> CategoryConfig {
    match category {
        Category::Wedding => CategoryConfig {
            greeting: greeting_for(category),
            instructions: "You are a warm, detail-oriented bridal and wedding-party stylist. \
                You know gowns, suits and tuxedos, fabrics by season, ceremony venues \
                (indoor, outdoor, destination), cultural and fusion dress, accessories, \
                and how to coordinate the couple with their wedding party. Be encouraging \
                and celebratory, never pushy about budget."
                .to_string(),
            quick_questions: strings(&[
                "What's your wedding date?",
                "What's your preferred style?",
                "What's your budget range?",
                "Indoor or outdoor ceremony?",
            ]),
            fallback: "I'm having trouble reaching our styling assistant right now, but I'd \
                still love to help with your wedding look. Could you share your wedding date, \
                the style you have in mind, and a rough budget? With those I can put together \
                a personalized requirement form for you."
                .to_string(),
            max_words: 120,
        },
        Category::Party => CategoryConfig {
            greeting: greeting_for(category),
            instructions: "You are an upbeat party-wear stylist. You know cocktail, themed, \
                festive and club looks, dress codes from smart casual to black tie, daytime \
                versus evening palettes, and statement accessories. Keep the tone fun and \
                energetic."
                .to_string(),
            quick_questions: strings(&[
                "What type of party?",
                "What's the dress code?",
                "Daytime or evening?",
                "What's your style preference?",
            ]),
            fallback: "Our party stylist is taking a short break, but let's keep the fun going! \
                Tell me what kind of party it is, the dress code, and whether it's a daytime \
                or evening event, and I'll note your preferences."
                .to_string(),
            max_words: 90,
        },
        Category::Corporate => CategoryConfig {
            greeting: greeting_for(category),
            instructions: "You are a polished corporate image consultant. You know business \
                formal and business casual codes, conference and gala attire, suiting fits \
                and fabrics, industry norms, and building a versatile work wardrobe. Keep \
                the tone professional and concise."
                .to_string(),
            quick_questions: strings(&[
                "Tell me about your event",
                "What's your style preference?",
                "What's your budget?",
                "Any specific requirements?",
            ]),
            fallback: "I can't reach our corporate styling assistant at the moment. To keep \
                things moving, could you describe the event, its dress code, and any company \
                guidelines? I'll capture those details for your consultation."
                .to_string(),
            max_words: 100,
        },
        Category::Casual => CategoryConfig {
            greeting: greeting_for(category),
            instructions: "You are a relaxed, friendly everyday-style advisor. You know \
                weekend outfits, smart casual, travel capsules, comfort-first fabrics, \
                layering for the weather, and mixing basics with personal touches. Keep the \
                tone easygoing and practical."
                .to_string(),
            quick_questions: strings(&[
                "Tell me about your event",
                "What's your style preference?",
                "What's your budget?",
                "Any specific requirements?",
            ]),
            fallback: "Looks like our style assistant is offline for a moment. In the \
                meantime, tell me about the occasion, the look you like, and your budget, \
                and I'll make sure we find something comfortable that suits you."
                .to_string(),
            max_words: 80,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_covers_every_category() {
        let catalog = Catalog::builtin();
        for category in Category::ALL {
            let entry = catalog.get(category).expect("missing builtin entry");
            assert!(!entry.greeting.is_empty());
            assert!(!entry.instructions.is_empty());
            assert!(!entry.fallback.is_empty());
            assert_eq!(entry.quick_questions.len(), 4);
            assert!(entry.max_words > 0);
        }
    }

    #[test]
    fn test_builtin_greeting_mentions_category() {
        let catalog = Catalog::builtin();
        let greeting = catalog.greeting(Category::Wedding);
        assert!(greeting.starts_with("Hi!"));
        assert!(greeting.contains("wedding requirements"));
    }

    #[test]
    fn test_quick_questions_per_category() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.quick_questions(Category::Wedding)[0],
            "What's your wedding date?"
        );
        assert_eq!(catalog.quick_questions(Category::Party)[1], "What's the dress code?");
        assert_eq!(
            catalog.quick_questions(Category::Corporate)[0],
            "Tell me about your event"
        );
        assert_eq!(
            catalog.quick_questions(Category::Casual),
            catalog.quick_questions(Category::Corporate)
        );
    }

    #[test]
    fn test_empty_catalog_misses() {
        let catalog = Catalog::empty();
        assert!(catalog.get(Category::Party).is_none());
        assert!(catalog.quick_questions(Category::Party).is_empty());
        assert!(catalog.greeting(Category::Party).contains("party requirements"));
    }

    #[test]
    fn test_load_overrides_single_category() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[party]
greeting = "Let's get you party ready!"
instructions = "You are a party stylist."
quick_questions = ["Theme?"]
fallback = "Back in a moment."
"#,
        )
        .unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        let party = catalog.get(Category::Party).unwrap();
        assert_eq!(party.greeting, "Let's get you party ready!");
        assert_eq!(party.quick_questions, vec!["Theme?".to_string()]);
        assert_eq!(party.max_words, 100);
        // Other categories keep the built-in content
        assert_eq!(
            catalog.get(Category::Wedding),
            Catalog::builtin().get(Category::Wedding)
        );
    }

    #[test]
    fn test_load_rejects_blank_greeting() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[casual]
greeting = "  "
instructions = "x"
fallback = "y"
"#,
        )
        .unwrap();
        let result = Catalog::load(file.path());
        assert!(matches!(result, Err(ChatError::Catalog(_))));
    }

    #[test]
    fn test_load_rejects_unknown_category() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[gala]\ngreeting = \"a\"\ninstructions = \"b\"\nfallback = \"c\"\n")
            .unwrap();
        assert!(Catalog::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_builtin_missing_file() {
        let catalog = Catalog::load_or_builtin(Some(Path::new("/nonexistent/catalog.toml")));
        assert!(catalog.get(Category::Casual).is_some());

        let catalog = Catalog::load_or_builtin(None);
        assert!(catalog.get(Category::Wedding).is_some());
    }
}
