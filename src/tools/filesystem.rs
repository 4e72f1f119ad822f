//! Filesystem tools - read, write, and list files

use async_trait::async_trait;

use super::Tool;
use crate::error::Error;
use crate::session::ToolArgs;
use crate::Result;

fn str_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Tool(format!("missing or invalid '{key}' argument")))
}

/// Read file contents
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> String {
        "Reads the contents of a file. Args: path (string).".to_string()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        let path = str_arg(args, "path")?;
        std::fs::read_to_string(path)
            .map_err(|e| Error::Tool(format!("failed to read {path}: {e}")))
    }
}

/// Write content to a file
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> String {
        "Writes content to a file, creating parent directories as needed. \
         Args: path (string), content (string)."
            .to_string()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        let path = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Tool(format!("failed to create directory: {e}")))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::Tool(format!("failed to write {path}: {e}")))?;

        Ok(format!("Successfully wrote {} bytes to {path}", content.len()))
    }
}

/// List directory contents
pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> String {
        "Lists the contents of a directory. Args: path (string).".to_string()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        let path = str_arg(args, "path")?;

        let entries: Vec<String> = std::fs::read_dir(path)
            .map_err(|e| Error::Tool(format!("failed to read directory {path}: {e}")))?
            .filter_map(|e| e.ok())
            .map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                let is_dir = e.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                if is_dir {
                    format!("{name}/")
                } else {
                    name
                }
            })
            .collect();

        Ok(entries.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn path_args(path: &std::path::Path) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert("path".to_string(), json!(path.to_str().unwrap()));
        args
    }

    #[tokio::test]
    async fn test_read_write_file() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("test.txt");

        let mut write_args = path_args(&file_path);
        write_args.insert("content".to_string(), json!("Hello, World!"));

        let write_result = WriteFileTool.execute(&write_args).await.unwrap();
        assert!(write_result.contains("Successfully wrote"));

        let read_result = ReadFileTool.execute(&path_args(&file_path)).await.unwrap();
        assert_eq!(read_result, "Hello, World!");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = ReadFileTool
            .execute(&path_args(&tmp.path().join("nope.txt")))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "").unwrap();
        std::fs::create_dir(tmp.path().join("subdir")).unwrap();

        let result = ListDirTool.execute(&path_args(tmp.path())).await.unwrap();

        assert!(result.contains("a.txt"));
        assert!(result.contains("b.txt"));
        assert!(result.contains("subdir/"));
    }
}
