//! Tools module - agent capabilities
//!
//! Tools are side-effecting actions the backend may request, such as
//! reading files and executing commands. Execution failures are returned
//! as errors; the orchestration loop converts them to textual content.

mod command;
mod filesystem;

pub use command::ExecuteCommandTool;
pub use filesystem::{ListDirTool, ReadFileTool, WriteFileTool};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::session::ToolArgs;
use crate::Result;

/// Tool description handed to the LLM backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in tool calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> String;

    /// Execute the tool with string-keyed JSON arguments
    async fn execute(&self, args: &ToolArgs) -> Result<String>;

    /// Convert to the descriptor sent to the LLM
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description(),
        }
    }
}

/// Instantiate the tools named by a toolset.
///
/// Unknown names are a configuration error rather than a silent skip.
pub fn active_tools(config: &Config, toolset: &str) -> Result<Vec<Box<dyn Tool>>> {
    let ts = config.get_toolset(toolset)?;
    let mut tools: Vec<Box<dyn Tool>> = Vec::with_capacity(ts.tools.len());
    for name in &ts.tools {
        match name.as_str() {
            "execute_command" => tools.push(Box::new(ExecuteCommandTool::new(
                config.allowed_commands.clone(),
            ))),
            "read_file" => tools.push(Box::new(ReadFileTool)),
            "write_file" => tools.push(Box::new(WriteFileTool)),
            "list_dir" => tools.push(Box::new(ListDirTool)),
            other => {
                return Err(Error::Config(format!(
                    "unknown tool '{other}' in toolset '{}'",
                    ts.name
                )))
            }
        }
    }
    Ok(tools)
}

/// Dummy tool for testing
#[cfg(test)]
pub struct DummyTool {
    pub name: String,
    pub result: String,
}

#[cfg(test)]
#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        "Dummy tool for testing".to_string()
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String> {
        Ok(self.result.clone())
    }
}

/// Tool that always fails, for testing error recovery
#[cfg(test)]
pub struct FailingTool;

#[cfg(test)]
#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing_tool"
    }

    fn description(&self) -> String {
        "Always fails".to_string()
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String> {
        Err(Error::Tool("boom".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Toolset;

    #[test]
    fn test_active_tools_from_toolset() {
        let mut config = Config::default();
        config.toolsets = vec![Toolset {
            name: "default".to_string(),
            tools: vec![
                "read_file".to_string(),
                "write_file".to_string(),
                "list_dir".to_string(),
                "execute_command".to_string(),
            ],
        }];

        let tools = active_tools(&config, "default").unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["read_file", "write_file", "list_dir", "execute_command"]);
    }

    #[test]
    fn test_active_tools_unknown_name() {
        let mut config = Config::default();
        config.toolsets = vec![Toolset {
            name: "default".to_string(),
            tools: vec!["teleport".to_string()],
        }];

        assert!(active_tools(&config, "default").is_err());
    }
}
