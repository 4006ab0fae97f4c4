//! Intent router and slot extractor.
//!
//! One model call returns both the intent label and the extracted slots as
//! JSON. When that fails for any reason the router falls back to regex id
//! extraction and decides the intent from what the context then holds.

use atelier_core::models::message::render_history;
use atelier_core::models::ExtractedSlots;
use atelier_core::{Intent, RelevantData};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{json_object_span, ConversationState};
use crate::workflow::Assistant;

/// Parsed router reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterDecision {
    pub intent: Intent,
    pub extracted: RelevantData,
}

#[derive(Debug, Deserialize)]
struct RouterReply {
    intent: Option<String>,
    relevant_data: Option<Value>,
}

pub async fn route(state: &mut ConversationState, assistant: &Assistant) {
    let input = state.latest_input.trim().to_string();
    if input.is_empty() {
        state.intent = Intent::None;
        return;
    }

    let prompt = routing_prompt(
        &render_history(&state.messages, assistant.settings.history_window),
        &input,
    );

    let decision = match assistant.llm.complete_json(&prompt).await {
        Ok(raw) => match parse_router_reply(&raw) {
            Some(decision) => Some(decision),
            None => {
                tracing::warn!(reply = %raw, "Router reply was not valid JSON, falling back to regex");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Router model call failed, falling back to regex");
            None
        }
    };

    let mut merged = state.relevant_data.clone();
    let intent = match decision {
        Some(decision) => {
            merged.merge(decision.extracted);
            decision.intent
        }
        None => {
            merged.merge(regex_extract(&input));
            if merged.is_empty() {
                Intent::None
            } else {
                Intent::Details
            }
        }
    };

    // Nothing to look up: treat as unclear rather than asking the viewer.
    let intent = if intent == Intent::Details && !merged.has_identity() && !merged.has_attributes() {
        Intent::None
    } else {
        intent
    };

    if intent == Intent::Recommendation {
        merged.forget_identity();
        merged.derive_search_keywords();
    }

    tracing::info!(
        intent = %intent,
        order_id = merged.order_id.as_deref().unwrap_or("-"),
        product_id = merged.product_id.as_deref().unwrap_or("-"),
        "Routed turn"
    );

    state.intent = intent;
    state.relevant_data = merged;
}

fn routing_prompt(history: &str, input: &str) -> String {
    format!(
        r#"You route messages for an online fashion store assistant.

Recent conversation:
{history}

Customer message: "{input}"

1. Pick exactly one intent:
   - "details": order or product information (status, shipping or delivery dates, price, image)
   - "recommendation": suggestions or similar products
   - "billing": buying or paying for a product that was already shown
   - "none": anything else

2. Extract whatever the customer mentions into relevant_data, using only these keys:
   order_id, product_id, name, brand, colour, fabric, occasion, print_pattern,
   top_type, sleeve_length, description. Use null for anything not mentioned.

Examples:
- "what is my order 12" -> {{"intent": "details", "relevant_data": {{"order_id": "12"}}}}
- "show product id 1020" -> {{"intent": "details", "relevant_data": {{"product_id": "1020"}}}}
- "find a blue kurta by W" -> {{"intent": "recommendation", "relevant_data": {{"colour": "blue", "top_type": "kurta", "brand": "W"}}}}
- "I'll buy it" -> {{"intent": "billing", "relevant_data": {{}}}}

Answer with one JSON object and nothing else."#
    )
}

/// Parse `{"intent": ..., "relevant_data": {...}}`. Slots written at the top
/// level instead of under `relevant_data` are accepted too. A missing intent
/// is `none`.
pub fn parse_router_reply(raw: &str) -> Option<RouterDecision> {
    let span = json_object_span(raw)?;
    let object: Value = serde_json::from_str(span).ok()?;
    let reply: RouterReply = serde_json::from_value(object.clone()).ok()?;

    let slots_source = match reply.relevant_data {
        Some(Value::Object(map)) => Value::Object(map),
        Some(Value::Null) | None => object,
        Some(_) => return None,
    };
    let slots: ExtractedSlots = serde_json::from_value(slots_source).ok()?;

    Some(RouterDecision {
        intent: reply.intent.as_deref().map(Intent::from_label).unwrap_or_default(),
        extracted: RelevantData::from(slots),
    })
}

/// Regex slot extraction over the lower-cased input: explicit product ids
/// first, then order ids, then a bare "id N" as an order id.
pub fn regex_extract(input: &str) -> RelevantData {
    let lowered = input.to_lowercase();
    let mut extracted = RelevantData::default();

    if let Ok(re) = Regex::new(r"\b(?:product|item)\s*(?:id|number|no\.?)?\s*#?([a-z0-9]*\d[a-z0-9]*)\b") {
        if let Some(caps) = re.captures(&lowered) {
            extracted.product_id = caps.get(1).map(|m| m.as_str().to_string());
        }
    }

    if let Ok(re) = Regex::new(r"\border\s*(?:id|number|no\.?)?\s*#?(\d+)\b") {
        if let Some(caps) = re.captures(&lowered) {
            extracted.order_id = caps.get(1).map(|m| m.as_str().to_string());
        }
    }

    if extracted.order_id.is_none() && extracted.product_id.is_none() {
        if let Ok(re) = Regex::new(r"\bid\s*#?(\d+)\b") {
            if let Some(caps) = re.captures(&lowered) {
                extracted.order_id = caps.get(1).map(|m| m.as_str().to_string());
            }
        }
    }

    extracted
}
