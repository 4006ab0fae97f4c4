use atelier_core::api::{ChatRequest, ChatResponse};
use atelier_core::models::message::latest_user_input;
use atelier_core::{ChatMessage, Intent, LlmError, RelevantData};
use thiserror::Error;

/// Everything one turn reads and writes while moving through the graph.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub latest_input: String,
    pub user_id: i64,
    pub intent: Intent,
    pub relevant_data: RelevantData,
    pub error_msg: Option<String>,
}

impl ConversationState {
    pub fn from_request(request: ChatRequest) -> Self {
        let latest_input = latest_user_input(&request.messages);
        Self {
            messages: request.messages,
            latest_input,
            user_id: request.user_id,
            intent: Intent::None,
            relevant_data: request.relevant_data,
            error_msg: None,
        }
    }

    pub fn reply(&mut self, role: &str, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    /// Record a handler failure; the workflow routes on its presence.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        tracing::warn!(intent = %self.intent, error = %message, "Handler failed");
        self.error_msg = Some(message);
    }

    pub fn into_response(self) -> ChatResponse {
        ChatResponse {
            messages: self.messages,
            relevant_data: self.relevant_data,
        }
    }
}

/// Handler failures. Collapsed to their display text at the node boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("No order found for order_id {order_id} and user {user_id}.")]
    OrderNotFound { order_id: String, user_id: i64 },

    #[error("No matching product found.")]
    ProductNotFound,

    #[error("No valid search terms were identified for product recommendation.")]
    NoSearchTerms,

    #[error("We couldn't find any products matching your criteria.")]
    NoRecommendations,

    #[error("Cannot place order: Missing product ID or price. Please start a new product search.")]
    MissingBillingInfo,
}
