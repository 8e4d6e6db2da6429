use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default OpenAI-compatible endpoint used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-5-nano";

/// Process-wide configuration sourced from the environment at startup.
///
/// Use [`Config::from_env()`] in the binary, or [`Config::builder()`] for
/// programmatic construction in tests.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inference backend credential (bearer token).
    pub api_key: String,

    /// Root containing one subdirectory per publication to organize.
    pub input_root: PathBuf,

    /// Root under which the canonical layout is created.
    pub output_root: PathBuf,

    /// OpenAI-compatible endpoint base URL.
    pub base_url: String,

    /// Model name sent with every request.
    pub model: String,

    /// Per-request timeout for inference calls.
    pub timeout: Duration,
}

/// A required environment value was missing at startup.
///
/// Each variant maps to a distinct non-zero process exit code so failures are
/// distinguishable from the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    MissingInputRoot,
    MissingOutputRoot,
}

impl ConfigError {
    /// Name of the environment variable that was missing.
    pub fn variable(&self) -> &'static str {
        match self {
            ConfigError::MissingApiKey => "OPENAI_API_KEY",
            ConfigError::MissingInputRoot => "INPUT_DIR",
            ConfigError::MissingOutputRoot => "OUTPUT_DIR",
        }
    }

    /// Distinct process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::MissingApiKey => 10000,
            ConfigError::MissingInputRoot => 10001,
            ConfigError::MissingOutputRoot => 10002,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} environment variable is not set", self.variable())
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Read the configuration from the environment.
    ///
    /// `OPENAI_API_KEY`, `INPUT_DIR` and `OUTPUT_DIR` are required;
    /// `OPENAI_BASE_URL` and `OPENAI_MODEL` fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require(ConfigError::MissingApiKey)?;
        let input_root = require(ConfigError::MissingInputRoot)?;
        let output_root = require(ConfigError::MissingOutputRoot)?;

        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            input_root: PathBuf::from(input_root),
            output_root: PathBuf::from(output_root),
            base_url,
            model,
            timeout: Duration::from_secs(120),
        })
    }

    /// Start building a config with the builder pattern.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

fn require(err: ConfigError) -> Result<String, ConfigError> {
    match env::var(err.variable()) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(err),
    }
}

/// Builder for [`Config`].
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config: Config {
                api_key: String::new(),
                input_root: PathBuf::new(),
                output_root: PathBuf::new(),
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                timeout: Duration::from_secs(120),
            },
        }
    }
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn with_input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_root = path.into();
        self
    }

    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            ConfigError::MissingApiKey.exit_code(),
            ConfigError::MissingInputRoot.exit_code(),
            ConfigError::MissingOutputRoot.exit_code(),
        ];
        for code in codes {
            assert_ne!(code, 0);
        }
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
        assert_ne!(codes[0], codes[2]);
    }

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder()
            .with_api_key("sk-test")
            .with_input_root("/in")
            .with_output_root("/out")
            .build();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.input_root, PathBuf::from("/in"));
    }

    #[test]
    fn test_error_display_names_variable() {
        let msg = ConfigError::MissingApiKey.to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
    }
}
