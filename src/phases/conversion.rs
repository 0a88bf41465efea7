//! Built-in conversion phase: render a target component manifest from an
//! analysis blueprint.

use super::{kebab_case, pascal_case};
use crate::errors::PhaseError;
use crate::refine::{PhaseContext, Transform};
use serde_json::{Value, json};

/// Maps a blueprint to the target component layout: one component (code,
/// template, styles), one service, and one model per migrated artifact.
#[derive(Debug, Clone, Default)]
pub struct ConversionTransform;

impl Transform for ConversionTransform {
    fn run(&self, input: &Value, _ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let component = input
            .get("component")
            .and_then(Value::as_str)
            .ok_or_else(|| PhaseError::transform("conversion", "blueprint missing component"))?;
        let category = input
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or(crate::classify::FALLBACK_CATEGORY);

        let feature = kebab_case(component);
        let class = pascal_case(&feature);

        let files = json!([
            {"path": format!("{feature}.component.ts"), "kind": "component", "class": format!("{class}Component")},
            {"path": format!("{feature}.component.html"), "kind": "template"},
            {"path": format!("{feature}.component.scss"), "kind": "styles"},
            {"path": format!("{feature}.service.ts"), "kind": "service", "class": format!("{class}Service")},
            {"path": format!("{feature}.model.ts"), "kind": "model", "class": class.clone()},
        ]);

        let imports: Vec<String> = input
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .filter_map(|dep| {
                        std::path::Path::new(dep)
                            .file_stem()
                            .map(|s| kebab_case(&s.to_string_lossy()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "feature_name": feature,
            "class_name": class,
            "category": category,
            "files": files,
            "imports": imports,
            "columns": input.get("columns").cloned().unwrap_or_else(|| json!([])),
            "handlers": input.get("handlers").cloned().unwrap_or_else(|| json!([])),
            "strict_typing": true,
            "error_handling": true,
        }))
    }
}
