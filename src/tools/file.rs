//! File reading tool.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, resolve_path, Tool};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadFileArgs {
    file_path: String,
}

/// Read the contents of a file.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at a given path relative to the workspace. Use this when you want to see what's inside a file. Do not use this with directory names."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace"
                }
            },
            "required": ["filePath"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let args: ReadFileArgs = parse_args(args)?;
        let path = resolve_path(workspace, &args.file_path);

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.file_path, e))?;

        // An empty file gives the model nothing to work with; report it.
        if content.is_empty() {
            anyhow::bail!("Failed to read {}: file is empty", args.file_path);
        }

        Ok(content)
    }
}
