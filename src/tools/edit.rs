//! File editing tool: single-occurrence string replacement.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, resolve_path, Tool};

#[derive(Debug, Deserialize)]
struct EditFileArgs {
    path: String,
    old_str: String,
    new_str: String,
}

/// Replace text in a file, or create it.
pub struct EditFile;

#[async_trait]
impl Tool for EditFile {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Make edits to a text file. Replaces 'old_str' with 'new_str' in the given file. 'old_str' must appear exactly once in the file and must differ from 'new_str'. If the file does not exist and 'old_str' is empty, the file is created with 'new_str' as its contents."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace"
                },
                "old_str": {
                    "type": "string",
                    "description": "Text to search for; must match exactly once"
                },
                "new_str": {
                    "type": "string",
                    "description": "Text to replace old_str with"
                }
            },
            "required": ["path", "old_str", "new_str"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: EditFileArgs = parse_args(args)?;
        if args.old_str == args.new_str {
            anyhow::bail!("old_str and new_str must be different");
        }

        let path = resolve_path(workspace, &args.path);

        if !path.exists() {
            if !args.old_str.is_empty() {
                anyhow::bail!("File not found: {}", args.path);
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &args.new_str).await?;
            return Ok(format!("Created {}", args.path));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.path, e))?;

        if args.old_str.is_empty() {
            anyhow::bail!("old_str must not be empty when editing an existing file");
        }

        match content.matches(args.old_str.as_str()).count() {
            0 => anyhow::bail!("old_str not found in {}", args.path),
            1 => {}
            n => anyhow::bail!(
                "old_str found {} times in {}; include more context to make it unique",
                n,
                args.path
            ),
        }

        let updated = content.replacen(args.old_str.as_str(), &args.new_str, 1);
        tokio::fs::write(&path, updated).await?;

        Ok("OK".to_string())
    }
}
