//! Typed reference extraction from legacy component source.
//!
//! Each reference kind gets its own extractor strategy with its own
//! pattern, so individual kinds stay independently testable instead of
//! one monolithic scan.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// The syntactic family a raw reference was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `import ... from '<ref>'`
    EsImport,
    /// `require('<ref>')`
    Require,
    /// `requires: [ '<ref>', ... ]` class list
    DeclaredList,
    /// `xtype: '<ref>'`
    WidgetAlias,
    /// `controller: '<ref>'`
    Controller,
    /// `viewModel: '<ref>'`
    ViewModel,
    /// `store: '<ref>'`
    Store,
    /// `model: '<ref>'`
    Model,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EsImport => "es_import",
            Self::Require => "require",
            Self::DeclaredList => "declared_list",
            Self::WidgetAlias => "widget_alias",
            Self::Controller => "controller",
            Self::ViewModel => "view_model",
            Self::Store => "store",
            Self::Model => "model",
        };
        write!(f, "{}", name)
    }
}

/// A raw reference string paired with the kind of syntax it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub raw: String,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn new(raw: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }
}

static ES_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:\{[^}]*\}|[^'"]+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});

static REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

static DECLARED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)requires\s*:\s*\[([^\]]*)\]").unwrap());

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());

static WIDGET_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"xtype\s*:\s*['"]([^'"]+)['"]"#).unwrap());

static CONTROLLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"controller\s*:\s*['"]([^'"]+)['"]"#).unwrap());

static VIEW_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"viewModel\s*:\s*['"]([^'"]+)['"]"#).unwrap());

static STORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"store\s*:\s*['"]([^'"{}]+)['"]"#).unwrap());

static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"model\s*:\s*['"]([^'"]+)['"]"#).unwrap());

/// One extraction strategy: a reference kind plus its pattern.
struct Extractor {
    kind: ReferenceKind,
    extract: fn(&str) -> Vec<String>,
}

fn captures_of(re: &Regex, content: &str) -> Vec<String> {
    re.captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn declared_list(content: &str) -> Vec<String> {
    // Only the first requires block is a class list; later matches tend to
    // be data, matching the legacy component convention.
    DECLARED_LIST
        .captures(content)
        .and_then(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .map(|inner| captures_of(&QUOTED, &inner))
        .unwrap_or_default()
}

fn extractors() -> [Extractor; 8] {
    [
        Extractor {
            kind: ReferenceKind::EsImport,
            extract: |c| captures_of(&ES_IMPORT, c),
        },
        Extractor {
            kind: ReferenceKind::Require,
            extract: |c| captures_of(&REQUIRE, c),
        },
        Extractor {
            kind: ReferenceKind::DeclaredList,
            extract: declared_list,
        },
        Extractor {
            kind: ReferenceKind::WidgetAlias,
            extract: |c| captures_of(&WIDGET_ALIAS, c),
        },
        Extractor {
            kind: ReferenceKind::Controller,
            extract: |c| captures_of(&CONTROLLER, c),
        },
        Extractor {
            kind: ReferenceKind::ViewModel,
            extract: |c| captures_of(&VIEW_MODEL, c),
        },
        Extractor {
            kind: ReferenceKind::Store,
            extract: |c| captures_of(&STORE, c),
        },
        Extractor {
            kind: ReferenceKind::Model,
            extract: |c| captures_of(&MODEL, c),
        },
    ]
}

/// Extract every reference from the given source content.
///
/// Extractors run in a fixed declared order and results are deduplicated
/// on the raw string preserving first occurrence, so the output is
/// deterministic for a given input. Malformed content never errors; it
/// simply yields fewer (or zero) references.
pub fn extract_references(content: &str) -> Vec<Reference> {
    let mut seen = std::collections::HashSet::new();
    let mut refs = Vec::new();

    for extractor in extractors() {
        for raw in (extractor.extract)(content) {
            if seen.insert(raw.clone()) {
                refs.push(Reference::new(raw, extractor.kind));
            }
        }
    }

    refs
}
