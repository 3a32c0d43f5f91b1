//! Project template detection.
//!
//! The browser bundler needs to know what kind of project it is running. A
//! `sandbox.config.json` with a `template` field wins; otherwise the
//! template is inferred from well-known dependencies in `package.json`.

use crate::error::{CliError, Result, ResultExt};
use serde_json::Value;
use std::path::Path;

/// Explicit template configuration file.
pub const SANDBOX_CONFIG: &str = "sandbox.config.json";

/// Dependency names that identify a template, checked in order.
const DEPENDENCY_TEMPLATES: &[(&str, &str)] = &[
    ("react-scripts", "react"),
    ("svelte", "svelte"),
    ("reason-react", "reason-reason"),
    ("parcel-bundler", "parcel"),
    ("@angular/core", "angular"),
    ("@vue/cli-service", "vue"),
    ("@dojo/cli", "dojo"),
    ("cx-react", "cxjs"),
    ("preact-cli", "preact"),
];

/// Detect the template of the project in `directory`.
///
/// `manifest` is the manifest file name, normally `package.json`.
///
/// # Errors
///
/// Fails with [`CliError::UnknownTemplate`] when either file holds invalid
/// JSON or nothing identifies the template.
pub fn detect_template(directory: &Path, manifest: &str) -> Result<String> {
    let sandbox_config = directory.join(SANDBOX_CONFIG);
    if sandbox_config.is_file() {
        let text = std::fs::read_to_string(&sandbox_config).with_path(&sandbox_config)?;
        let template = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|config| config.get("template")?.as_str().map(str::to_string))
            .ok_or_else(|| CliError::UnknownTemplate(format!("Invalid {}", SANDBOX_CONFIG)))?;
        tracing::debug!(%template, "Template from {}", SANDBOX_CONFIG);
        return Ok(template);
    }

    let manifest_path = directory.join(manifest);
    if manifest_path.is_file() {
        let text = std::fs::read_to_string(&manifest_path).with_path(&manifest_path)?;
        let package: Value = serde_json::from_str(&text)
            .map_err(|_| CliError::UnknownTemplate(format!("Invalid {}", manifest)))?;

        if let Some(template) = template_from_dependencies(&package) {
            tracing::debug!(template, "Template from dependencies");
            return Ok(template.to_string());
        }
    }

    Err(CliError::UnknownTemplate("Unknown project template!".to_string()))
}

fn template_from_dependencies(package: &Value) -> Option<&'static str> {
    let has = |name: &str| {
        ["dependencies", "devDependencies"]
            .iter()
            .any(|field| package.get(field).and_then(|deps| deps.get(name)).is_some())
    };

    DEPENDENCY_TEMPLATES
        .iter()
        .find(|(dependency, _)| has(dependency))
        .map(|(_, template)| *template)
}
