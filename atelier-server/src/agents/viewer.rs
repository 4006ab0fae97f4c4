//! Order and product details.

use atelier_core::RelevantData;
use sqlx::SqlitePool;

use super::{AgentError, ConversationState, VIEWER_ROLE};
use crate::store;
use crate::workflow::Assistant;

pub const ASK_FOR_IDENTITY: &str = "Could you please specify your order ID or describe the product?";

pub async fn view(state: &mut ConversationState, assistant: &Assistant) {
    if let Err(e) = answer(state, assistant).await {
        state.fail(e);
    }
}

async fn answer(state: &mut ConversationState, assistant: &Assistant) -> Result<(), AgentError> {
    if !state.relevant_data.has_identity() && !state.relevant_data.has_attributes() {
        state.reply(VIEWER_ROLE, ASK_FOR_IDENTITY);
        return Ok(());
    }

    if !state.relevant_data.has_cached_details() {
        let found = lookup(&assistant.pool, &state.relevant_data, state.user_id).await?;
        state.relevant_data.merge(found);
    }

    if wants_image(&state.latest_input) {
        if let Some(img) = state.relevant_data.img.clone() {
            state.reply(VIEWER_ROLE, img);
            return Ok(());
        }
    }

    let prompt = format!(
        r#"You are a helpful assistant for an online fashion store.
The customer asked: "{}"

Known details:
{}

Answer the question in one or two short sentences using only these details.
Mention the status and delivery date when the question is about an order."#,
        state.latest_input,
        state.relevant_data.to_prompt_lines()
    );
    let reply = assistant.llm.complete(&prompt).await?;
    state.reply(VIEWER_ROLE, reply);
    Ok(())
}

/// One store lookup: by order when an order id is known, otherwise by
/// product id, otherwise by attributes.
async fn lookup(pool: &SqlitePool, context: &RelevantData, user_id: i64) -> Result<RelevantData, AgentError> {
    if let Some(order_id) = context.order_id.as_deref() {
        let not_found = || AgentError::OrderNotFound {
            order_id: order_id.to_string(),
            user_id,
        };
        let id: i64 = order_id.parse().map_err(|_| not_found())?;
        let order = store::find_order(pool, id, user_id).await?.ok_or_else(not_found)?;
        tracing::debug!(order_id = id, user_id, status = %order.status, "Order found");
        return Ok(RelevantData::from(&order));
    }

    let product = match context.product_id.as_deref() {
        Some(product_id) => store::find_product(pool, product_id).await?,
        None => store::find_product_by_attributes(pool, &context.attributes()).await?,
    };
    let product = product.ok_or(AgentError::ProductNotFound)?;
    tracing::debug!(product_id = %product.p_id, "Product found");
    Ok(RelevantData::from(&product))
}

fn wants_image(input: &str) -> bool {
    let lowered = input.to_lowercase();
    lowered.contains("image") || lowered.contains("img")
}
