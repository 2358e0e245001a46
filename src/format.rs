//! Document and output formatting utilities.

use crate::storage::Storage;
use serde_json::Value;
use std::path::Path;

/// Encoding of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick a format from a file name, ignoring a trailing `.gz`.
    ///
    /// `.yaml` and `.yml` select YAML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            DocumentFormat::Yaml
        } else {
            DocumentFormat::Json
        }
    }
}

/// Whether a path names a gzip-compressed document.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Render a value in the requested format.
///
/// Markdown falls back to a fenced JSON block for anything but scalars.
pub fn render_value(value: &Value, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Markdown => match value {
            Value::Array(_) | Value::Object(_) => {
                format!("```json\n{}\n```\n", serde_json::to_string_pretty(value)?)
            }
            scalar => format!("`{}`\n", scalar_text(scalar)),
        },
    })
}

/// Render a storage's data (and structure metadata) in the requested format.
pub fn render_storage(storage: &Storage, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Markdown => Ok(format_storage_markdown(storage)),
        other => {
            let data: serde_json::Map<String, Value> = storage
                .data()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            render_value(&Value::Object(data), other)
        }
    }
}

/// Format a storage as a markdown table of keys, values and defaults.
pub fn format_storage_markdown(storage: &Storage) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Storage: {}\n", storage.name()));
    md.push_str(&format!("- **keys**: {}\n", storage.len()));
    md.push_str(&format!("- **defined**: {}\n", storage.structure().len()));

    let obsolete = storage.obsolete_keys();
    if !obsolete.is_empty() {
        let keys: Vec<String> = obsolete.iter().map(|k| format!("`{}`", k)).collect();
        md.push_str(&format!("- **obsolete**: {}\n", keys.join(", ")));
    }

    if storage.is_empty() {
        return md;
    }

    md.push_str("\n| key | value | default | serialize |\n");
    md.push_str("|---|---|---|---|\n");
    for (key, value) in storage.data() {
        let control = storage.structure().get(key);
        let default = control
            .and_then(|c| c.default.as_ref())
            .map(scalar_text)
            .unwrap_or_default();
        let serialize = if control.is_some_and(|c| c.serialize) {
            "yes"
        } else {
            ""
        };
        md.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            key,
            escape_cell(&scalar_text(value)),
            escape_cell(&default),
            serialize
        ));
    }

    md
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
