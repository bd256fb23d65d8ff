//! Configuration management for AskRC.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.askrc/config.yaml`, or the path in `ASKRC_CONFIG`)
//! - Environment variables
//! - Command-line flags (see [`AppConfig::with_overrides`])
//!
//! Secrets never live in the config file itself; the file names the
//! environment variables that hold them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Generation providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .askrc/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    pub search: SearchConfig,
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
    pub screening: ScreeningConfig,
    pub alerts: AlertConfig,
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Search service base URL, e.g. `https://askrc.search.windows.net`
    pub endpoint: Option<String>,

    /// Index holding the documentation fragments
    pub index: String,

    /// Environment variable holding the query key
    pub api_key_env: String,

    /// REST API version sent with every query
    pub api_version: String,

    /// Number of fragments requested per question
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            index: "askrcindex".to_string(),
            api_key_env: "AZURE_SEARCH_KEY".to_string(),
            api_version: "2023-11-01".to_string(),
            top_k: 8,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Provider identifier (see [`KNOWN_PROVIDERS`])
    pub provider: String,

    /// Custom endpoint for OpenAI-compatible gateways
    pub endpoint: Option<String>,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Completion token budget
    pub max_tokens: u32,

    pub temperature: Option<f32>,

    /// Total attempts when the backend rate-limits us
    pub max_retries: u32,

    /// Fixed pause between rate-limited attempts
    pub retry_delay_secs: u64,

    /// Optional YAML prompt template overriding the built-in one
    pub prompt_file: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: None,
            model: "gpt-4-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 1024,
            temperature: None,
            max_retries: 3,
            retry_delay_secs: 5,
            prompt_file: None,
        }
    }
}

impl GenerationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Grounding check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Distinct shared content words required for an answer to count as grounded
    pub threshold: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { threshold: 7 }
    }
}

/// Bias screening settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreeningConfig {
    /// When false, every text passes the screen untouched
    pub enabled: bool,

    /// Additional phrases flagged on top of the built-in lexicon
    pub extra_terms: Vec<String>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_terms: Vec::new(),
        }
    }
}

/// Out-of-band alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertConfig {
    pub enabled: bool,

    /// Environment variable holding the incoming-webhook URL
    pub webhook_url_env: String,

    /// Channel label attached to every alert
    pub channel: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url_env: "SLACK_WEBHOOK_URL".to_string(),
            channel: "slack".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    search: Option<SearchConfig>,
    generation: Option<GenerationConfig>,
    validation: Option<ValidationConfig>,
    screening: Option<ScreeningConfig>,
    alerts: Option<AlertConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            search: SearchConfig::default(),
            generation: GenerationConfig::default(),
            validation: ValidationConfig::default(),
            screening: ScreeningConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `ASKRC_WORKSPACE`: Workspace path (when `workspace` is `None`)
    /// - `ASKRC_CONFIG`: Config file path (when `config_file` is `None`)
    /// - `ASKRC_SEARCH_ENDPOINT` / `AZURE_SEARCH_ENDPOINT`: Search endpoint
    /// - `ASKRC_SEARCH_INDEX`: Index name
    /// - `ASKRC_PROVIDER`, `ASKRC_MODEL`, `ASKRC_GENERATION_ENDPOINT`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use askrc_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Index: {}", config.search.index);
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("ASKRC_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("ASKRC_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.askrc_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();
        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(validation) = config_file.validation {
            result.validation = validation;
        }
        if let Some(screening) = config_file.screening {
            result.screening = screening;
        }
        if let Some(alerts) = config_file.alerts {
            result.alerts = alerts;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        // Relative prompt files resolve against the workspace
        if let Some(ref prompt_file) = result.generation.prompt_file {
            if prompt_file.is_relative() {
                result.generation.prompt_file = Some(result.workspace.join(prompt_file));
            }
        }

        Ok(result)
    }

    /// Environment variables override the config file.
    fn apply_env(&mut self) {
        if let Some(endpoint) = env_string("ASKRC_SEARCH_ENDPOINT")
            .or_else(|| env_string("AZURE_SEARCH_ENDPOINT"))
        {
            self.search.endpoint = Some(endpoint);
        }

        if let Some(index) = env_string("ASKRC_SEARCH_INDEX") {
            self.search.index = index;
        }

        if let Some(provider) = env_string("ASKRC_PROVIDER") {
            self.generation.provider = provider;
        }

        if let Some(model) = env_string("ASKRC_MODEL") {
            self.generation.model = model;
        }

        if let Some(endpoint) = env_string("ASKRC_GENERATION_ENDPOINT") {
            self.generation.endpoint = Some(endpoint);
        }

        if let Some(level) = env_string("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the environment and the config file.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        top_k: Option<usize>,
        threshold: Option<usize>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(model) = model {
            self.generation.model = model;
        }

        if let Some(top_k) = top_k {
            self.search.top_k = top_k;
        }

        if let Some(threshold) = threshold {
            self.validation.threshold = threshold;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .askrc directory.
    pub fn askrc_dir(&self) -> PathBuf {
        self.workspace.join(".askrc")
    }

    /// Search query key from the configured environment variable.
    pub fn search_api_key(&self) -> Option<String> {
        env_string(&self.search.api_key_env)
    }

    /// Generation API key from the configured environment variable.
    pub fn generation_api_key(&self) -> Option<String> {
        env_string(&self.generation.api_key_env)
    }

    /// Alert webhook URL, if alerts are enabled and the variable is set.
    pub fn webhook_url(&self) -> Option<String> {
        if !self.alerts.enabled {
            return None;
        }
        env_string(&self.alerts.webhook_url_env)
    }

    /// Validate the settings needed to answer questions.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.generation.provider.as_str();
        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.search.endpoint.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::Config(
                "Search endpoint not configured. Set search.endpoint or ASKRC_SEARCH_ENDPOINT"
                    .to_string(),
            ));
        }

        if self.search.top_k == 0 {
            return Err(AppError::Config("search.topK must be at least 1".to_string()));
        }

        if self.generation.max_retries == 0 {
            return Err(AppError::Config(
                "generation.maxRetries must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.search.endpoint = Some("https://askrc.search.windows.net".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.index, "askrcindex");
        assert_eq!(config.search.top_k, 8);
        assert_eq!(config.generation.provider, "openai");
        assert_eq!(config.generation.model, "gpt-4-turbo");
        assert_eq!(config.generation.max_tokens, 1024);
        assert_eq!(config.generation.max_retries, 3);
        assert_eq!(config.generation.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.validation.threshold, 7);
        assert!(config.screening.enabled);
        assert!(!config.verbose);
    }

    #[test]
    fn test_askrc_dir() {
        let config = AppConfig::default();
        assert!(config.askrc_dir().ends_with(".askrc"));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
search:
  endpoint: https://docs.search.windows.net
  topK: 4
generation:
  model: gpt-4o-mini
  retryDelaySecs: 1
  promptFile: prompts/askrc.yml
validation:
  threshold: 5
logging:
  level: debug
  color: false
"#
        )
        .unwrap();

        let mut base = AppConfig::default();
        base.workspace = dir.path().to_path_buf();
        let merged = base.merge_yaml(&path).unwrap();

        assert_eq!(
            merged.search.endpoint.as_deref(),
            Some("https://docs.search.windows.net")
        );
        assert_eq!(merged.search.top_k, 4);
        // Unspecified fields keep their defaults
        assert_eq!(merged.search.index, "askrcindex");
        assert_eq!(merged.generation.model, "gpt-4o-mini");
        assert_eq!(merged.generation.max_retries, 3);
        assert_eq!(merged.generation.retry_delay_secs, 1);
        assert_eq!(
            merged.generation.prompt_file,
            Some(dir.path().join("prompts/askrc.yml"))
        );
        assert_eq!(merged.validation.threshold, 5);
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_yaml_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "search: [not, a, map]").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            Some("gpt-4o".to_string()),
            Some(3),
            Some(9),
            None,
            true,
            false,
        );

        assert_eq!(overridden.generation.model, "gpt-4o");
        assert_eq!(overridden.search.top_k, 3);
        assert_eq!(overridden.validation.threshold, 9);
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_ok() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = configured();
        config.generation.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Search endpoint"));
    }

    #[test]
    fn test_validate_zero_bounds() {
        let mut config = configured();
        config.search.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.generation.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_disabled() {
        let mut config = AppConfig::default();
        config.alerts.enabled = false;
        assert_eq!(config.webhook_url(), None);
    }
}
