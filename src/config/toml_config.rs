use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub order_client: OrderClientSettings,
    pub file_reader: FileReaderSettings,
    #[serde(default)]
    pub run: RunSettings,
}

/// Chat-completion provider used by the note extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`. `/chat/completions` is appended.
    pub host: String,
    pub api_key: String,
    pub model_name: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderClientSettings {
    pub host: String,
    /// Per-request timeout in seconds.
    pub client_timeout: u64,
    /// Skip delivery entirely (dry run).
    #[serde(default)]
    pub bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReaderSettings {
    pub directory_path: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default)]
    pub fail_on_note_errors: bool,
}

fn default_llm_timeout() -> u64 {
    60
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ConfigError {
            message: format!("cannot read '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("llm.host", &self.llm.host)?;
        validation::validate_non_empty_string("llm.model_name", &self.llm.model_name)?;
        validation::validate_positive_number("llm.timeout_seconds", self.llm.timeout_seconds, 1)?;

        // an unresolved ${VAR} means the environment variable was never set
        if self.llm.api_key.starts_with("${") {
            return Err(PipelineError::MissingConfigError {
                field: "llm.api_key".to_string(),
            });
        }
        validation::validate_non_empty_string("llm.api_key", &self.llm.api_key)?;

        validation::validate_url("order_client.host", &self.order_client.host)?;
        validation::validate_positive_number(
            "order_client.client_timeout",
            self.order_client.client_timeout,
            1,
        )?;

        validation::validate_path("file_reader.directory_path", &self.file_reader.directory_path)?;
        validation::validate_extensions("file_reader.extensions", &self.file_reader.extensions)?;

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
