//! Tool registry and the tools the model may call.
//!
//! Every tool advertises a JSON Schema for its arguments. The registry
//! validates the model's arguments against that schema before the tool runs,
//! so implementations only ever see conforming input.

mod edit;
mod file;
mod list;

pub use edit::EditFile;
pub use file::ReadFile;
pub use list::ListFiles;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonschema::{Draft, JSONSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{FunctionSchema, ToolSchema};

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Shown to the model to help it pick the right tool.
    fn description(&self) -> &str;

    /// JSON Schema for the accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `args` has already been validated against
    /// [`Tool::parameters_schema`].
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;
}

/// Registry and dispatch failures.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("invalid argument schema for {tool}: {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool {tool} failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },

    #[error("tool {tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    schema: Value,
    validator: JSONSchema,
}

/// Catalog of tools, read-only once the session starts.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
    workspace: PathBuf,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry whose tools resolve paths against `workspace`.
    pub fn new(workspace: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
            workspace: workspace.into(),
            timeout,
        }
    }

    /// Create a registry holding the built-in file tools.
    pub fn with_defaults(workspace: impl Into<PathBuf>, timeout: Duration) -> Result<Self, ToolError> {
        let mut registry = Self::new(workspace, timeout);
        registry.register(ReadFile)?;
        registry.register(ListFiles)?;
        registry.register(EditFile)?;
        Ok(registry)
    }

    /// Add a tool. Names must be unique and schemas must compile.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        let schema = tool.parameters_schema();
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| ToolError::InvalidSchema {
                tool: name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(tool = %name, "Registered tool");

        self.by_name.insert(name, self.tools.len());
        self.tools.push(RegisteredTool {
            tool: Arc::new(tool),
            schema,
            validator,
        });
        Ok(())
    }

    /// List registered tools in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.tool.name().to_string(),
                description: t.tool.description().to_string(),
            })
            .collect()
    }

    /// Catalog in the form the transport sends to the model.
    pub fn describe_all(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                tool_type: "function".to_string(),
                function: FunctionSchema {
                    name: t.tool.name().to_string(),
                    description: t.tool.description().to_string(),
                    parameters: t.schema.clone(),
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run a tool.
    ///
    /// `arguments` is the JSON text the model produced; an empty string is
    /// treated as `{}`. Every failure is returned as a [`ToolError`] so the
    /// caller can report it back to the model.
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let entry = self
            .by_name
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = parse_arguments(arguments).map_err(|reason| ToolError::InvalidArguments {
            tool: name.to_string(),
            reason,
        })?;

        if let Err(errors) = entry.validator.validate(&args) {
            let reason = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                reason,
            });
        }

        tracing::info!(tool = %name, "Executing tool");

        match tokio::time::timeout(self.timeout, entry.tool.execute(args, &self.workspace)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ToolError::ExecutionFailed {
                tool: name.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(ToolError::TimedOut {
                tool: name.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| format!("arguments are not valid JSON: {}", e))
}

/// Deserialize validated arguments into a tool's typed argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> anyhow::Result<T> {
    serde_json::from_value(args).map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))
}

/// Resolve a tool-supplied path against the workspace. Absolute paths are kept.
pub(crate) fn resolve_path(workspace: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace.join(candidate)
    }
}
