//! Request and response bodies of the HTTP API, shared by server and CLI.

use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, RelevantData};

pub const PROTOCOL: &str = "atelier/1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub msg: String,
    pub user_id: Option<i64>,
}

impl LoginResponse {
    pub fn ok(user_id: i64) -> Self {
        Self {
            success: true,
            msg: "Login successful".to_string(),
            user_id: Some(user_id),
        }
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub user_id: i64,
    #[serde(default)]
    pub relevant_data: RelevantData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
    pub relevant_data: RelevantData,
}
