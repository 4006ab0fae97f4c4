pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;

pub use config::AtelierConfig;
pub use error::AtelierError;
pub use llm::{
    create_backend, LlmBackend, LlmBackendConfig, LlmClientConfig, LlmError, OllamaClient,
    OpenAiCompatibleClient,
};
pub use models::{ChatMessage, Intent, RelevantData};
