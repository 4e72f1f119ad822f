//! Command tool - execute allow-listed shell commands

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::Tool;
use crate::error::Error;
use crate::session::ToolArgs;
use crate::Result;

/// Executes OS commands matched against configured wildcard patterns.
///
/// A pattern like `git status*` allows `git status` and `git status -s`;
/// `*` in a pattern matches any run of characters. An empty allow-list
/// rejects everything.
pub struct ExecuteCommandTool {
    allowed_commands: Vec<String>,
}

impl ExecuteCommandTool {
    pub fn new(allowed_commands: Vec<String>) -> Self {
        Self { allowed_commands }
    }

    fn is_allowed(&self, command: &str) -> Result<bool> {
        for pattern in &self.allowed_commands {
            let re = pattern_to_regex(pattern)?;
            if re.is_match(command) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$"))
        .map_err(|e| Error::Tool(format!("invalid allowed command pattern '{pattern}': {e}")))
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> String {
        if self.allowed_commands.is_empty() {
            return "Executes a shell command. No commands are currently allowed. \
                    Args: command (string)."
                .to_string();
        }

        let mut allowed_list = String::from("Allowed command wildcard patterns:\n");
        for cmd in &self.allowed_commands {
            allowed_list.push_str(&format!("- {cmd}\n"));
        }

        format!("Executes a shell command. Args: command (string).\n{allowed_list}")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("missing or invalid 'command' argument".to_string()))?;

        if !self.is_allowed(command)? {
            return Err(Error::Tool(format!(
                "command '{command}' is not in the list of allowed commands"
            )));
        }

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Tool("empty command".to_string()))?;

        let output = Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|e| Error::Tool(format!("failed to spawn '{program}': {e}")))?;

        // Combined output, stdout first, matching what the model is told
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::Tool(format!(
                "command execution failed. Output:\n{combined}"
            )));
        }

        Ok(format!("Command executed successfully. Output:\n{combined}"))
    }
}
