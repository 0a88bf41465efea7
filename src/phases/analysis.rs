//! Built-in analysis phase: extract a migration blueprint from legacy
//! component source.

use crate::errors::PhaseError;
use crate::refine::{PhaseContext, Transform};
use crate::resolver::{ReferenceKind, extract_references};
use regex::Regex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static CLASS_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Ext\.define\(\s*['"]([^'"]+)['"]"#).unwrap());

static DATA_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"dataIndex\s*:\s*['"]([^'"]+)['"]"#).unwrap());

static HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*:\s*function\s*\(").unwrap());

fn captures(re: &Regex, content: &str) -> Vec<String> {
    re.captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Produces the blueprint consumed by the conversion phase: class
/// identity, grouped references, extracted models/stores/columns, and
/// the handler functions that carry custom logic.
#[derive(Debug, Clone, Default)]
pub struct AnalysisTransform;

impl Transform for AnalysisTransform {
    fn run(&self, _input: &Value, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let content = ctx.source_content;
        let component = ctx
            .artifact_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| PhaseError::transform("analysis", "artifact path has no file stem"))?;

        let references = extract_references(content);
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for reference in &references {
            grouped
                .entry(reference.kind.to_string())
                .or_default()
                .push(reference.raw.clone());
        }

        let models: Vec<String> = references
            .iter()
            .filter(|r| {
                r.kind == ReferenceKind::Model
                    || (r.kind == ReferenceKind::DeclaredList && r.raw.contains(".model."))
            })
            .map(|r| r.raw.clone())
            .collect();

        let stores: Vec<String> = references
            .iter()
            .filter(|r| {
                r.kind == ReferenceKind::Store
                    || (r.kind == ReferenceKind::DeclaredList && r.raw.contains(".store."))
            })
            .map(|r| r.raw.clone())
            .collect();

        let class_name = CLASS_DEFINE
            .captures(content)
            .and_then(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| component.clone());

        Ok(json!({
            "component": component,
            "class_name": class_name,
            "category": ctx.category,
            "references": grouped,
            "models": models,
            "stores": stores,
            "columns": captures(&DATA_INDEX, content),
            "handlers": captures(&HANDLER, content),
            "dependencies": ctx.dependencies,
            "source_lines": content.lines().count(),
        }))
    }
}
