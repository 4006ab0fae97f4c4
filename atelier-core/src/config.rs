use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AtelierConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub backend: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    pub history_window: usize,
    pub max_recommendations: u32,
    pub shipping_lead_days: i64,
    pub delivery_lead_days: i64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            history_window: 4,
            max_recommendations: 3,
            shipping_lead_days: 1,
            delivery_lead_days: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl AtelierConfig {
    /// Load from a TOML file, then apply `ATELIER__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("ATELIER").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
