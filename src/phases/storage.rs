//! Built-in storage phase: write the converted component into the target
//! layout and report the deployment manifest.

use super::pascal_case;
use crate::errors::PhaseError;
use crate::project::TargetLayout;
use crate::refine::{PhaseContext, Transform};
use serde_json::{Value, json};
use std::path::Path;

/// Writes one file per manifest entry under
/// `features/<category>/<feature>/` and verifies the result.
#[derive(Debug, Clone, Default)]
pub struct StorageTransform;

fn render_stub(kind: &str, class: Option<&str>, feature: &str) -> String {
    match kind {
        "component" => {
            let class = class.unwrap_or("MigratedComponent");
            format!(
                "import {{ Component }} from '@angular/core';\n\n@Component({{\n  selector: 'app-{feature}',\n  templateUrl: './{feature}.component.html',\n  styleUrls: ['./{feature}.component.scss'],\n}})\nexport class {class} {{}}\n"
            )
        }
        "template" => format!("<section class=\"{feature}\"></section>\n"),
        "styles" => format!(".{feature} {{\n}}\n"),
        "service" => {
            let class = class.unwrap_or("MigratedService");
            format!(
                "import {{ Injectable }} from '@angular/core';\n\n@Injectable({{ providedIn: 'root' }})\nexport class {class} {{}}\n"
            )
        }
        "model" => {
            let class = class.unwrap_or("MigratedModel");
            format!("export interface {} {{\n  id: number;\n}}\n", pascal_case(class))
        }
        _ => String::new(),
    }
}

impl Transform for StorageTransform {
    fn run(&self, input: &Value, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let feature = input
            .get("feature_name")
            .and_then(Value::as_str)
            .ok_or_else(|| PhaseError::transform("storage", "manifest missing feature_name"))?;
        let category = input
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or(crate::classify::FALLBACK_CATEGORY);
        let files = input
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| PhaseError::transform("storage", "manifest missing files"))?;

        let layout = TargetLayout::new(ctx.target_root);
        layout
            .ensure_scaffold()
            .map_err(|err| PhaseError::transform("storage", err.to_string()))?;

        let component_dir = layout.feature_dir(category, feature);
        std::fs::create_dir_all(&component_dir).map_err(|err| {
            PhaseError::transform(
                "storage",
                format!("Failed to create {}: {err}", component_dir.display()),
            )
        })?;

        let mut written = Vec::new();
        for file in files {
            let Some(rel) = file.get("path").and_then(Value::as_str) else {
                continue;
            };
            let kind = file.get("kind").and_then(Value::as_str).unwrap_or("");
            let class = file.get("class").and_then(Value::as_str);
            let path = component_dir.join(rel);
            std::fs::write(&path, render_stub(kind, class, feature)).map_err(|err| {
                PhaseError::transform(
                    "storage",
                    format!("Failed to write {}: {err}", path.display()),
                )
            })?;
            written.push(path.display().to_string());
        }

        let verified = written.iter().all(|p| Path::new(p).is_file());

        Ok(json!({
            "feature_name": feature,
            "category": category,
            "structure": format!("features/{category}/{feature}"),
            "written": written,
            "file_count": written.len(),
            "verified": verified,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manifest() -> Value {
        json!({
            "feature_name": "user-grid",
            "category": "users",
            "files": [
                {"path": "user-grid.component.ts", "kind": "component", "class": "UserGridComponent"},
                {"path": "user-grid.component.html", "kind": "template"},
                {"path": "user-grid.service.ts", "kind": "service", "class": "UserGridService"},
            ],
        })
    }

    #[test]
    fn test_storage_writes_files_under_feature_dir() {
        let dir = tempdir().unwrap();
        let artifact = std::path::PathBuf::from("/app/UserGrid.js");
        let ctx = PhaseContext {
            artifact_path: &artifact,
            source_content: "",
            category: "users",
            dependencies: &[],
            target_root: dir.path(),
        };

        let result = StorageTransform.run(&manifest(), &ctx).unwrap();

        assert_eq!(result["file_count"], 3);
        assert_eq!(result["verified"], true);
        assert_eq!(result["structure"], "features/users/user-grid");

        let component = dir
            .path()
            .join("features/users/user-grid/user-grid.component.ts");
        let content = std::fs::read_to_string(component).unwrap();
        assert!(content.contains("export class UserGridComponent"));
        assert!(content.contains("app-user-grid"));
    }

    #[test]
    fn test_storage_requires_feature_name() {
        let dir = tempdir().unwrap();
        let artifact = std::path::PathBuf::from("/app/UserGrid.js");
        let ctx = PhaseContext {
            artifact_path: &artifact,
            source_content: "",
            category: "users",
            dependencies: &[],
            target_root: dir.path(),
        };

        let result = StorageTransform.run(&json!({"files": []}), &ctx);
        assert!(matches!(result, Err(PhaseError::TransformFailed { .. })));
    }
}
