//! Terminal handlers for failed and unclear turns. Both always reply.

use super::{ConversationState, ERROR_ROLE, NONE_ROLE};
use crate::workflow::Assistant;

pub const CLARIFY_FALLBACK: &str = "I'm not sure what you'd like to do. I can check the status of an order, \
show you a product, or recommend something new. Could you tell me a bit more?";

/// Apologise for the recorded error and suggest a next step. Clears `error_msg`.
pub async fn apologize(state: &mut ConversationState, assistant: &Assistant) {
    let error = state
        .error_msg
        .take()
        .unwrap_or_else(|| "An unknown error occurred.".to_string());

    let prompt = format!(
        r#"The user said: "{}".
An error occurred: "{}".
Respond politely, apologize if needed, and suggest a next step or correction."#,
        state.latest_input, error
    );
    let reply = match assistant.llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Apology generation failed");
            format!("Sorry, something went wrong: {} Please try again or rephrase your request.", error)
        }
    };
    state.reply(ERROR_ROLE, reply);
}

/// Ask the user to clarify a turn with no recognisable intent.
pub async fn clarify(state: &mut ConversationState, assistant: &Assistant) {
    let prompt = format!(
        r#"The user said: "{}".
You could not determine what they want.
Politely ask for clarification or suggest things they can do
(like checking an order, viewing a product, or exploring recommendations)."#,
        state.latest_input
    );
    let reply = match assistant.llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Clarification generation failed");
            CLARIFY_FALLBACK.to_string()
        }
    };
    state.reply(NONE_ROLE, reply);
}
