//! Order placement for the product currently in context.

use chrono::{Duration, Local, NaiveDate};

use super::{AgentError, ConversationState, BILLING_ROLE};
use crate::store::{self, NewOrder};
use crate::workflow::Assistant;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub async fn bill(state: &mut ConversationState, assistant: &Assistant) {
    let today = Local::now().date_naive();
    if let Err(e) = place_order(state, assistant, today).await {
        state.fail(e);
    }
}

async fn place_order(
    state: &mut ConversationState,
    assistant: &Assistant,
    today: NaiveDate,
) -> Result<(), AgentError> {
    let product_id = state
        .relevant_data
        .product_id
        .clone()
        .ok_or(AgentError::MissingBillingInfo)?;

    let mut price = state.relevant_data.price;
    let mut name = state.relevant_data.name.clone();
    if price.is_none() || name.is_none() {
        if let Some(product) = store::find_product(&assistant.pool, &product_id).await? {
            price = price.or(Some(product.price));
            name = name.or(Some(product.name));
        }
    }
    let amount = price
        .filter(|p| *p > 0.0)
        .ok_or(AgentError::MissingBillingInfo)?;
    let name = name.unwrap_or_else(|| "recommended product".to_string());

    let settings = &assistant.settings;
    let order = NewOrder {
        product_id: product_id.clone(),
        user_id: state.user_id,
        product_description: name.clone(),
        order_date: today.format(DATE_FORMAT).to_string(),
        shipping_date: (today + Duration::days(settings.shipping_lead_days))
            .format(DATE_FORMAT)
            .to_string(),
        delivery_date: (today + Duration::days(settings.delivery_lead_days))
            .format(DATE_FORMAT)
            .to_string(),
        amount,
        status: "ordered".to_string(),
    };
    let order_id = store::insert_order(&assistant.pool, &order).await?;
    tracing::info!(order_id, user_id = state.user_id, product_id = %product_id, amount, "Order placed");

    state.reply(
        BILLING_ROLE,
        format!(
            "Order placed! Thank you for purchasing the {}.\n\nYour new Order ID is {}. \
             The total amount charged is ${:.2}. It's expected to deliver on {}.",
            name, order_id, amount, order.delivery_date
        ),
    );

    let context = &mut state.relevant_data;
    context.clear_product();
    context.order_id = Some(order_id.to_string());
    context.amount = Some(amount);
    context.status = Some(order.status);
    context.order_date = Some(order.order_date);
    context.shipping_date = Some(order.shipping_date);
    context.delivery_date = Some(order.delivery_date);
    Ok(())
}
