//! Keyword search over the catalogue.

use atelier_core::models::ProductSummary;
use regex::Regex;
use serde::Deserialize;

use super::{json_object_span, AgentError, ConversationState, RECO_ROLE};
use crate::store;
use crate::workflow::Assistant;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "are", "you", "can", "please", "show", "find", "want", "need", "some",
    "something", "any", "like", "looking", "give", "get", "suggest", "recommend", "recommendations",
    "similar", "that", "this", "have", "what", "which", "from", "more", "other", "others",
];

#[derive(Debug, Deserialize)]
struct KeywordReply {
    #[serde(default)]
    keywords: Vec<String>,
}

pub async fn recommend(state: &mut ConversationState, assistant: &Assistant) {
    if let Err(e) = answer(state, assistant).await {
        state.fail(e);
    }
}

async fn answer(state: &mut ConversationState, assistant: &Assistant) -> Result<(), AgentError> {
    let keywords = if state.relevant_data.search_keywords.is_empty() {
        keywords_for(&state.latest_input, assistant).await
    } else {
        state.relevant_data.search_keywords.clone()
    };
    if keywords.is_empty() {
        return Err(AgentError::NoSearchTerms);
    }

    let products = store::search_products(&assistant.pool, &keywords, assistant.settings.max_recommendations).await?;
    tracing::info!(keywords = ?keywords, found = products.len(), "Product search");
    if products.is_empty() {
        return Err(AgentError::NoRecommendations);
    }

    let listing = plain_listing(&products);
    let prompt = format!(
        r#"You are a friendly stylist for an online fashion store.
The customer asked: "{}"

Matching products:
{}

Recommend these products in a short, warm reply. Keep each product's ID and price."#,
        state.latest_input, listing
    );
    let reply = match assistant.llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Could not phrase recommendations, sending the plain list");
            format!("Here are some products you might like:\n{}", listing)
        }
    };

    state.relevant_data.search_keywords = keywords;
    state.reply(RECO_ROLE, reply);
    Ok(())
}

/// Ask the model for keywords; tokenise the input when that fails.
async fn keywords_for(input: &str, assistant: &Assistant) -> Vec<String> {
    let prompt = format!(
        r#"Extract product search keywords (colours, product types, brands, fabrics, occasions)
from this shopping request: "{}"
Answer as JSON: {{"keywords": ["..."]}}"#,
        input
    );

    let from_model = match assistant.llm.complete_json(&prompt).await {
        Ok(raw) => parse_keywords(&raw),
        Err(e) => {
            tracing::warn!(error = %e, "Keyword extraction failed, tokenising input");
            Vec::new()
        }
    };
    if from_model.is_empty() {
        tokenize(input)
    } else {
        from_model
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    json_object_span(raw)
        .and_then(|span| serde_json::from_str::<KeywordReply>(span).ok())
        .map(|reply| {
            reply
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Words of three or more letters, lower-cased, minus stopwords.
pub fn tokenize(input: &str) -> Vec<String> {
    let lowered = input.to_lowercase();
    let mut words = Vec::new();
    if let Ok(re) = Regex::new(r"\b[a-z]{3,}\b") {
        for m in re.find_iter(&lowered) {
            let word = m.as_str();
            if !STOPWORDS.contains(&word) && !words.iter().any(|w| w == word) {
                words.push(word.to_string());
            }
        }
    }
    words
}

fn plain_listing(products: &[ProductSummary]) -> String {
    products
        .iter()
        .map(|p| format!("- {}", p.headline()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{assistant, ScriptedLlm};
    use crate::store::test_support::seeded_pool;
    use atelier_core::{ChatMessage, RelevantData};

    fn state_with(input: &str, relevant_data: RelevantData) -> ConversationState {
        ConversationState {
            messages: vec![ChatMessage::user(input)],
            latest_input: input.to_string(),
            user_id: 1,
            relevant_data,
            ..Default::default()
        }
    }

    #[test]
    fn test_tokenize_drops_short_words_and_stopwords() {
        assert_eq!(tokenize("Show me a red kurti, please"), vec!["red", "kurti"]);
        assert_eq!(tokenize("festive festive SILK"), vec!["festive", "silk"]);
        assert!(tokenize("me a to").is_empty());
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_keywords(r#"{"keywords": ["silk", " saree ", ""]}"#), vec!["silk", "saree"]);
        assert!(parse_keywords("silk saree").is_empty());
        assert!(parse_keywords(r#"{"words": ["silk"]}"#).is_empty());
    }

    #[tokio::test]
    async fn test_context_keywords_search_and_phrase() {
        let llm = ScriptedLlm::new().on("Matching products", "You will love the Silk Saree (ID: 1022).");
        let assistant = assistant(seeded_pool().await, llm);
        let context = RelevantData {
            search_keywords: vec!["festive".to_string()],
            ..Default::default()
        };
        let mut state = state_with("something festive", context);

        recommend(&mut state, &assistant).await;
        assert!(state.error_msg.is_none());
        let reply = state.messages.last().unwrap();
        assert_eq!(reply.role, RECO_ROLE);
        assert_eq!(reply.content, "You will love the Silk Saree (ID: 1022).");
    }

    #[tokio::test]
    async fn test_model_keywords_used_when_context_has_none() {
        let llm = ScriptedLlm::new().on("search keywords", r#"{"keywords": ["striped"]}"#);
        let assistant = assistant(seeded_pool().await, llm);
        let mut state = state_with("I like lines on my clothes", RelevantData::default());

        recommend(&mut state, &assistant).await;
        assert!(state.error_msg.is_none());
        assert_eq!(state.relevant_data.search_keywords, vec!["striped"]);
        // Phrasing prompt is echoed back and carries the listing.
        assert!(state.messages.last().unwrap().content.contains("Striped Shirt by Roadster (ID: 1021)"));
    }

    #[tokio::test]
    async fn test_plain_list_when_model_is_down() {
        let assistant = assistant(seeded_pool().await, ScriptedLlm::failing());
        let mut state = state_with("a silk saree", RelevantData::default());

        recommend(&mut state, &assistant).await;
        assert!(state.error_msg.is_none());
        let reply = &state.messages.last().unwrap().content;
        assert!(reply.starts_with("Here are some products you might like:"));
        assert!(reply.contains("(ID: 1022)"));
    }

    #[tokio::test]
    async fn test_no_terms_and_no_matches_are_errors() {
        let assistant = assistant(seeded_pool().await, ScriptedLlm::failing());

        let mut state = state_with("show me some", RelevantData::default());
        recommend(&mut state, &assistant).await;
        assert_eq!(
            state.error_msg.as_deref(),
            Some("No valid search terms were identified for product recommendation.")
        );

        let mut state = state_with("show me a red kurti", RelevantData::default());
        recommend(&mut state, &assistant).await;
        assert_eq!(
            state.error_msg.as_deref(),
            Some("We couldn't find any products matching your criteria.")
        );
    }

    #[tokio::test]
    async fn test_results_limited_by_settings() {
        let mut assistant = assistant(seeded_pool().await, ScriptedLlm::new());
        assistant.settings.max_recommendations = 1;
        let context = RelevantData {
            search_keywords: vec!["festive".to_string(), "striped".to_string()],
            ..Default::default()
        };
        let mut state = state_with("anything", context);

        recommend(&mut state, &assistant).await;
        let reply = &state.messages.last().unwrap().content;
        assert!(reply.contains("(ID: 1022)"), "best rated match is kept");
        assert!(!reply.contains("(ID: 1020)"));
        assert!(!reply.contains("(ID: 1021)"));
    }
}
