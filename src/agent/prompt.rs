//! System prompt template for the agent.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool definitions.
pub fn build_system_prompt(workspace_path: &str, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful assistant chatting with a user in a terminal. You can read and edit files in the workspace directory: {workspace_path}

## Your Capabilities

You have access to the following tools:
{tool_descriptions}

## Guidelines

1. **Use tools when they help** - If the user asks about files, look at them instead of guessing.

2. **Read before edit** - Read a file's contents before modifying it, unless you're creating a new file.

3. **Recover from tool errors** - A tool result starting with "Error:" means the call failed. Fix the arguments or try another approach.

4. **Be concise** - Answer the user directly once you have what you need.

If you need to use a tool, respond with a tool call. The system will execute it and return the result."#,
        workspace_path = workspace_path,
        tool_descriptions = tool_descriptions
    )
}
