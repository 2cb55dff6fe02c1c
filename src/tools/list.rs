//! Directory listing tool.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::{parse_args, resolve_path, Tool};

const MAX_ENTRIES: usize = 500;

/// Directories never worth showing to the model.
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

#[derive(Debug, Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    path: Option<String>,
}

/// List files and directories recursively.
pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories at a given path, recursively. If no path is provided, lists files in the workspace root. Directories end with a trailing slash."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Optional relative path to list. Defaults to the workspace root."
                }
            }
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: ListFilesArgs = parse_args(args)?;
        let rel = args.path.unwrap_or_else(|| ".".to_string());
        let root = resolve_path(workspace, &rel);

        if !root.is_dir() {
            anyhow::bail!("Not a directory: {}", rel);
        }

        // walkdir is blocking; keep it off the async workers.
        let entries = tokio::task::spawn_blocking(move || collect_entries(&root)).await??;

        Ok(serde_json::to_string(&entries)?)
    }
}

fn collect_entries(root: &Path) -> anyhow::Result<Vec<String>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && SKIPPED_DIRS.iter().any(|d| *d == name))
        });

    for entry in walker {
        let entry = entry?;

        // Only mark truncation when an entry past the cap actually exists.
        if entries.len() >= MAX_ENTRIES {
            entries.push(format!("... (truncated at {} entries)", MAX_ENTRIES));
            break;
        }

        let rel = entry.path().strip_prefix(root)?.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            entries.push(format!("{}/", rel));
        } else {
            entries.push(rel);
        }
    }

    Ok(entries)
}
