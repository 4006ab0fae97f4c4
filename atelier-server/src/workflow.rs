//! The per-turn state machine.
//!
//! ```text
//! Router -> Viewer | Recommendation | Billing | None
//! Viewer | Recommendation | Billing -> Error (if error_msg) | END
//! Error | None -> END
//! ```

use std::sync::Arc;

use atelier_core::api::{ChatRequest, ChatResponse};
use atelier_core::config::AssistantConfig;
use atelier_core::{Intent, LlmBackend};
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::agents::{billing, fallback, recommendation, router, viewer, ConversationState};

/// Shared dependencies of every handler. Cheap to share behind an `Arc`.
pub struct Assistant {
    pub pool: SqlitePool,
    pub llm: Arc<dyn LlmBackend>,
    pub settings: AssistantConfig,
}

/// A node of the turn graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Router,
    Viewer,
    Recommendation,
    Billing,
    Error,
    None,
}

/// Final state of a turn and the nodes it passed through.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: ConversationState,
    pub path: Vec<Node>,
}

/// Handler node for a routed intent.
pub fn select_handler(intent: Intent) -> Node {
    match intent {
        Intent::Details => Node::Viewer,
        Intent::Recommendation => Node::Recommendation,
        Intent::Billing => Node::Billing,
        Intent::None => Node::None,
    }
}

impl Assistant {
    pub fn new(pool: SqlitePool, llm: Arc<dyn LlmBackend>, settings: AssistantConfig) -> Self {
        Self { pool, llm, settings }
    }

    /// Run one turn from the router to END.
    pub async fn run_turn(&self, state: ConversationState) -> TurnOutcome {
        let turn_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("turn", %turn_id, user_id = state.user_id);
        self.walk(state).instrument(span).await
    }

    async fn walk(&self, mut state: ConversationState) -> TurnOutcome {
        let mut path = vec![Node::Router];
        router::route(&mut state, self).await;

        let handler = select_handler(state.intent);
        path.push(handler);
        match handler {
            Node::Viewer => viewer::view(&mut state, self).await,
            Node::Recommendation => recommendation::recommend(&mut state, self).await,
            Node::Billing => billing::bill(&mut state, self).await,
            _ => fallback::clarify(&mut state, self).await,
        }

        if handler != Node::None && state.error_msg.is_some() {
            path.push(Node::Error);
            fallback::apologize(&mut state, self).await;
        }

        tracing::debug!(path = ?path, "Turn finished");
        TurnOutcome { state, path }
    }

    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let state = ConversationState::from_request(request);
        self.run_turn(state).await.state.into_response()
    }
}
