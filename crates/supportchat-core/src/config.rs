use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SupportError};

/// Top-level configuration for SupportChat.
///
/// Loaded from `supportchat.toml` by default. Every section falls back to
/// its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SupportConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SupportConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unparseable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SupportError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum request body size (covers multipart uploads).
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            body_limit_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Document and conversation store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/supportchat.db".to_string(),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider API key. `GEMINI_API_KEY` overrides this at startup.
    pub api_key: String,
    /// Model name passed to `generateContent`.
    pub model: String,
    /// Provider API root.
    pub base_url: String,
    /// Upper bound on a single completion call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Keyword retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum documents injected as context.
    pub max_results: usize,
    /// Tokens must be strictly longer than this many characters.
    pub min_token_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_token_len: 3,
        }
    }
}

/// Where the grounding instruction goes in the provider request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemInstructionMode {
    /// Prepended to the user's question in the final user turn.
    #[default]
    Inline,
    /// Sent through the provider's dedicated system instruction field.
    Separate,
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Number of most recent session messages considered as history.
    pub history_limit: usize,
    pub system_instruction_mode: SystemInstructionMode,
    /// Also send the pending question as the newest history turn, so the
    /// provider sees it twice. Off by default.
    pub repeat_query_in_history: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            system_instruction_mode: SystemInstructionMode::Inline,
            repeat_query_in_history: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SupportConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.path, "data/supportchat.db");
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.retrieval.max_results, 5);
        assert_eq!(config.retrieval.min_token_len, 3);
        assert_eq!(config.prompt.history_limit, 10);
        assert_eq!(
            config.prompt.system_instruction_mode,
            SystemInstructionMode::Inline
        );
        assert!(!config.prompt.repeat_query_in_history);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 5001

[database]
path = "/var/lib/supportchat/chat.db"

[llm]
model = "gemini-2.5-flash"
timeout_secs = 10

[prompt]
history_limit = 6
system_instruction_mode = "separate"
repeat_query_in_history = true
"#;
        let file = create_temp_config(content);
        let config = SupportConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.database.path, "/var/lib/supportchat/chat.db");
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.timeout_secs, 10);
        assert_eq!(config.prompt.history_limit, 6);
        assert!(config.prompt.repeat_query_in_history);
        assert_eq!(
            config.prompt.system_instruction_mode,
            SystemInstructionMode::Separate
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[logging]
level = "debug"
"#;
        let file = create_temp_config(content);
        let config = SupportConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.retrieval.max_results, 5);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = SupportConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.prompt.history_limit, 10);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = SupportConfig::load(file.path());
        assert!(matches!(result, Err(SupportError::Config(_))));
    }

    #[test]
    fn test_load_unknown_instruction_mode_fails() {
        let file = create_temp_config("[prompt]\nsystem_instruction_mode = \"both\"\n");
        assert!(SupportConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = SupportConfig::load_or_default(Path::new("/nonexistent/supportchat.toml"));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("supportchat.toml");

        let mut config = SupportConfig::default();
        config.server.port = 8080;
        config.prompt.system_instruction_mode = SystemInstructionMode::Separate;
        config.save(&path).unwrap();

        let reloaded = SupportConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 8080);
        assert_eq!(
            reloaded.prompt.system_instruction_mode,
            SystemInstructionMode::Separate
        );
    }
}
