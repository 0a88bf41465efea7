//! Artifact categorization.
//!
//! Routes migrated components into feature areas using a keyword table,
//! behind a trait so the heuristic can be swapped without touching the
//! orchestration flow.

/// Assigns a feature category to an artifact.
pub trait ArtifactClassifier {
    /// Category for a component given its name and (optionally) content.
    fn categorize(&self, component_name: &str, content: &str) -> String;

    /// True when the file is a shared utility rather than feature code.
    fn is_shared_utility(&self, file_name: &str) -> bool;
}

/// Fallback category when no keyword matches.
pub const FALLBACK_CATEGORY: &str = "common";

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("users", &["user", "account", "profile", "login", "auth"]),
    (
        "connections",
        &["connection", "external", "integration", "adapter", "connector"],
    ),
    ("maps", &["map", "mapping", "geographic", "location", "route"]),
    ("products", &["product", "catalog", "inventory", "sku"]),
    ("orders", &["order", "transaction", "purchase", "checkout"]),
    ("reports", &["report", "dashboard", "analytics", "metrics"]),
    ("settings", &["configuration", "setup", "preferences", "config"]),
];

const SHARED_SUFFIXES: &[&str] = &[
    ".interface.ts",
    ".model.ts",
    ".enum.ts",
    ".constants.ts",
    ".const.ts",
    ".dto.ts",
    ".dao.ts",
    ".service.ts",
    ".utils.ts",
    ".utility.ts",
    ".helper.ts",
    ".pipe.ts",
    ".directive.ts",
    ".guard.ts",
    ".interceptor.ts",
];

/// Default keyword-table classifier.
///
/// Checks the component name first and only falls back to content when
/// the name is inconclusive, so renamed-but-recognizable components land
/// in the right feature area.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn match_keywords(haystack: &str) -> Option<String> {
        for (category, keywords) in CATEGORY_KEYWORDS {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                return Some((*category).to_string());
            }
        }
        None
    }
}

impl ArtifactClassifier for KeywordClassifier {
    fn categorize(&self, component_name: &str, content: &str) -> String {
        let name = component_name.to_lowercase();
        if let Some(category) = Self::match_keywords(&name) {
            return category;
        }

        let content = content.to_lowercase();
        Self::match_keywords(&content).unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }

    fn is_shared_utility(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        SHARED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    }
}
