//! Configuration management
//!
//! Configuration is merged from two JSON files: a user-level file under the
//! home directory and a project-level file under the current working
//! directory, with the latter taking precedence key by key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::Result;

/// A named selection of tools the agent may use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolset {
    pub name: String,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider to use ("mock" ships with the binary)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Named toolsets; a "default" toolset is mandatory
    #[serde(default = "default_toolsets")]
    pub toolsets: Vec<Toolset>,

    /// Wildcard patterns for commands the execute_command tool may run
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "mock-model".to_string()
}

fn default_toolsets() -> Vec<Toolset> {
    vec![Toolset {
        name: "default".to_string(),
        tools: vec![
            "read_file".to_string(),
            "write_file".to_string(),
            "list_dir".to_string(),
            "execute_command".to_string(),
        ],
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            toolsets: default_toolsets(),
            allowed_commands: Vec::new(),
        }
    }
}

impl Config {
    /// Find a toolset by name. An empty or unknown name falls back to the
    /// mandatory "default" toolset.
    pub fn get_toolset(&self, name: &str) -> Result<&Toolset> {
        let name = if name.is_empty() { "default" } else { name };
        if let Some(ts) = self.toolsets.iter().find(|ts| ts.name == name) {
            return Ok(ts);
        }
        if name == "default" {
            return Err(Error::Config(
                "mandatory 'default' toolset not found in configuration".to_string(),
            ));
        }
        self.get_toolset("default")
    }
}

/// Get the user-level config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tandem")
}

/// Get the user-level config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Get the project-level config file path under the working directory
pub fn project_config_path() -> PathBuf {
    PathBuf::from(".tandem").join("config.json")
}

/// Load configuration, merging the user-level file with the project-level
/// one. Missing files are fine; defaults apply.
pub fn load() -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    for path in [config_path(), project_config_path()] {
        if let Some(overlay) = read_config_value(&path)? {
            merge_objects(&mut merged, overlay);
        }
    }

    Ok(serde_json::from_value(merged)?)
}

fn read_config_value(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid config file {path:?}: {e}")))?;
    Ok(Some(value))
}

/// Top-level keys present in `overlay` replace those in `base`.
fn merge_objects(base: &mut Value, overlay: Value) {
    if let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) {
        for (key, value) in overlay_map {
            base_map.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.model, "mock-model");
        assert_eq!(config.toolsets.len(), 1);
        assert_eq!(config.toolsets[0].name, "default");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.toolsets.len(), config.toolsets.len());
    }

    #[test]
    fn test_get_toolset_fallback() {
        let config = Config::default();

        // Empty name and unknown name both resolve to default
        assert_eq!(config.get_toolset("").unwrap().name, "default");
        assert_eq!(config.get_toolset("nope").unwrap().name, "default");
    }

    #[test]
    fn test_get_toolset_missing_default() {
        let config = Config {
            toolsets: vec![],
            ..Config::default()
        };
        assert!(config.get_toolset("default").is_err());
    }

    #[test]
    fn test_merge_objects_overlay_wins() {
        let mut base = serde_json::to_value(Config::default()).unwrap();
        let overlay = serde_json::json!({ "model": "other-model" });
        merge_objects(&mut base, overlay);

        let merged: Config = serde_json::from_value(base).unwrap();
        assert_eq!(merged.model, "other-model");
        assert_eq!(merged.provider, "mock");
    }
}
