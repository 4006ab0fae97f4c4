//! Conversation handlers: the nodes of the turn state machine.
//!
//! Every handler takes the turn's `ConversationState` and the shared
//! `Assistant`. Handlers never return errors; failures are recorded in
//! `state.error_msg` and the workflow routes to the error handler.

pub mod billing;
pub mod fallback;
pub mod recommendation;
pub mod router;
pub mod state;
pub mod viewer;

pub use state::{AgentError, ConversationState};

pub const VIEWER_ROLE: &str = "viewer_agent";
pub const RECO_ROLE: &str = "reco_agent";
pub const BILLING_ROLE: &str = "billing_agent";
pub const ERROR_ROLE: &str = "error_agent";
pub const NONE_ROLE: &str = "none_agent";

/// The first `{ ... }` span of a model reply. Small models wrap JSON in prose
/// or code fences.
pub(crate) fn json_object_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
