// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Aesthete

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::evaluation::ScoringMode;
use crate::folders::CollisionPolicy;
use crate::vision::ImageDetail;
use crate::{Result, SorterError};

/// Environment variable consulted when `openai.api_key` is empty
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Vision model provider
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Output and log locations
    #[serde(default)]
    pub directories: DirectoryConfig,

    /// Evaluation log and move history files
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// How scores are derived and files are placed
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiConfig {
    /// Leave empty to read the key from `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout; 0 waits forever
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub detail: ImageDetail,
    /// Downscale images whose longest side exceeds this before upload
    #[serde(default)]
    pub max_image_dimension: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DirectoryConfig {
    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Evaluation log file name inside the logs directory
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Move history file name inside the logs directory
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_evaluation_prompt")]
    pub evaluation_prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub mode: ScoringMode,
    #[serde(default)]
    pub collision: CollisionPolicy,
}

// Default value functions
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_max_tokens() -> u32 { 1000 }
fn default_timeout() -> u64 { 120 }
fn default_output_dir() -> PathBuf { PathBuf::from("output_folders") }
fn default_logs_dir() -> PathBuf { PathBuf::from("logs") }
fn default_log_file() -> String { "evaluation_log.txt".to_string() }
fn default_history_file() -> String { "move_history.jsonl".to_string() }

fn default_evaluation_prompt() -> String {
    "Analyze the following image and provide:\n\
     1. Brief Description: Describe what's in the image\n\
     2. Individual Scores (1-10 for each): Composition, Color, Lighting, Subject, \
     Originality, Technical Skill, Emotion, Storytelling, Clarity, Creativity\n\
     3. Overall Score: Average of above scores (1-100)\n\
     4. Final Reason: Brief explanation of the overall rating\n\n\
     Format your response exactly as:\n\
     Description: [brief description]\n\
     Composition: [1-10]\n\
     Color: [1-10]\n\
     Lighting: [1-10]\n\
     Subject: [1-10]\n\
     Originality: [1-10]\n\
     Technical Skill: [1-10]\n\
     Emotion: [1-10]\n\
     Storytelling: [1-10]\n\
     Clarity: [1-10]\n\
     Creativity: [1-10]\n\
     Score: [1-100]\n\
     Reason: [final explanation]"
        .to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            detail: ImageDetail::default(),
            max_image_dimension: None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            output: default_output_dir(),
            logs: default_logs_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            history_file: default_history_file(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            evaluation_prompt: default_evaluation_prompt(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SorterError::Config(format!(
                "Config file not found at {:?}. Run `aesthete init` to create one",
                path
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| SorterError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.openai.max_tokens == 0 {
            return Err(SorterError::Config("openai.max_tokens must be greater than 0".to_string()));
        }
        if self.prompts.evaluation_prompt.trim().is_empty() {
            return Err(SorterError::Config("prompts.evaluation_prompt is empty".to_string()));
        }
        if self.logging.file.trim().is_empty() {
            return Err(SorterError::Config("logging.file is empty".to_string()));
        }
        Ok(())
    }

    /// The configured key, else `OPENAI_API_KEY`
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Key lookup with an injectable environment
    pub fn resolve_api_key_with<F>(&self, env: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let configured = self.openai.api_key.trim();
        if !configured.is_empty() {
            return Ok(configured.to_string());
        }
        env(API_KEY_ENV)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SorterError::Config(format!(
                    "No API key configured. Set openai.api_key or {}",
                    API_KEY_ENV
                ))
            })
    }

    /// Full path of the evaluation log
    pub fn log_path(&self) -> PathBuf {
        self.directories.logs.join(&self.logging.file)
    }

    /// Full path of the move history
    pub fn history_path(&self) -> PathBuf {
        self.directories.logs.join(&self.logging.history_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = AppConfig::from_yaml("openai:\n  api_key: sk-test\n").unwrap();
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.max_tokens, 1000);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.detail, ImageDetail::High);
        assert_eq!(config.directories.output, PathBuf::from("output_folders"));
        assert_eq!(config.log_path(), PathBuf::from("logs").join("evaluation_log.txt"));
        assert_eq!(config.scoring.mode, ScoringMode::AveragedAttributes);
        assert_eq!(config.scoring.collision, CollisionPolicy::Rename);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
openai:
  api_key: ""
  max_tokens: 500
  timeout_secs: 0
  detail: low
  max_image_dimension: 1024
directories:
  output: sorted
  logs: /tmp/aesthete-logs
logging:
  file: runs.txt
prompts:
  evaluation_prompt: "Rate this"
scoring:
  mode: direct_score
  collision: skip
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.openai.max_tokens, 500);
        assert_eq!(config.openai.timeout_secs, 0);
        assert_eq!(config.openai.detail, ImageDetail::Low);
        assert_eq!(config.openai.max_image_dimension, Some(1024));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/aesthete-logs/runs.txt"));
        assert_eq!(config.prompts.evaluation_prompt, "Rate this");
        assert_eq!(config.scoring.mode, ScoringMode::DirectScore);
        assert_eq!(config.scoring.collision, CollisionPolicy::Skip);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = AppConfig::from_yaml("scoring:\n  mode: median\n").unwrap_err();
        assert!(matches!(err, SorterError::Config(_)));

        let err = AppConfig::from_yaml("openai:\n  max_tokens: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("config.yaml")).unwrap_err();
        assert!(matches!(err, SorterError::Config(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.directories.output = PathBuf::from("buckets");
        config.scoring.mode = ScoringMode::DirectScore;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.directories.output, PathBuf::from("buckets"));
        assert_eq!(loaded.scoring.mode, ScoringMode::DirectScore);
        assert_eq!(loaded.prompts.evaluation_prompt, config.prompts.evaluation_prompt);
    }

    #[test]
    fn test_api_key_resolution() {
        let mut config = AppConfig::default();

        let key = config
            .resolve_api_key_with(|name| {
                assert_eq!(name, API_KEY_ENV);
                Some("sk-env".to_string())
            })
            .unwrap();
        assert_eq!(key, "sk-env");

        assert!(config.resolve_api_key_with(|_| None).is_err());
        assert!(config.resolve_api_key_with(|_| Some("  ".to_string())).is_err());

        config.openai.api_key = "sk-config".to_string();
        assert_eq!(config.resolve_api_key_with(|_| Some("sk-env".to_string())).unwrap(), "sk-config");
    }
}
