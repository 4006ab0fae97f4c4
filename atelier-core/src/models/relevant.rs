//! Slot-filling context carried across conversation turns.
//!
//! The client echoes `relevant_data` back on every `/chat` call, so this type is
//! both the wire format and the router's working memory. Deserialization is
//! lenient: ids may be numbers, prices may be numeric strings, and blank strings
//! count as absent. Keys this struct does not know are kept in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::order::OrderDetails;
use super::product::ProductSummary;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevantData {
    // identity
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    // product attributes
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub print_pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub top_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sleeve_length: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // looked up from the store
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub shipping_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_keywords: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Copy every `Some` field of `$from` over `$into`.
macro_rules! overwrite_present {
    ($into:expr, $from:expr; $($field:ident),+ $(,)?) => {
        $(
            if $from.$field.is_some() {
                $into.$field = $from.$field;
            }
        )+
    };
}

impl RelevantData {
    pub fn is_empty(&self) -> bool {
        *self == RelevantData::default()
    }

    pub fn has_identity(&self) -> bool {
        self.order_id.is_some() || self.product_id.is_some()
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes().is_empty()
    }

    /// Present attribute slots, in search-priority order.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", &self.name),
            ("brand", &self.brand),
            ("colour", &self.colour),
            ("fabric", &self.fabric),
            ("occasion", &self.occasion),
            ("print_pattern", &self.print_pattern),
            ("top_type", &self.top_type),
            ("sleeve_length", &self.sleeve_length),
            ("description", &self.description),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }

    /// True when an earlier lookup already filled the context.
    pub fn has_cached_details(&self) -> bool {
        self.status.is_some()
            || self.delivery_date.is_some()
            || self.shipping_date.is_some()
            || self.img.is_some()
            || self.price.is_some()
    }

    /// Merge a newer extraction into this context. Absent values never erase
    /// present ones. A changed order or product id drops the details looked up
    /// for the previous one. A new product also ends the order it came from,
    /// unless the same extraction names an order too.
    pub fn merge(&mut self, incoming: RelevantData) {
        if incoming.order_id.is_some() && incoming.order_id != self.order_id {
            self.forget_order_details();
        }
        if incoming.product_id.is_some() && incoming.product_id != self.product_id {
            if self.product_id.is_some() {
                self.forget_product_description();
            }
            if incoming.order_id.is_none() {
                self.order_id = None;
            }
            self.forget_order_details();
        }

        overwrite_present!(self, incoming;
            order_id, product_id,
            name, brand, colour, fabric, occasion, print_pattern, top_type, sleeve_length, description,
            status, order_date, shipping_date, delivery_date, amount, price, img,
        );

        if !incoming.search_keywords.is_empty() {
            self.search_keywords = incoming.search_keywords;
        }
        for (key, value) in incoming.extra {
            if !is_blank(&value) {
                self.extra.insert(key, value);
            }
        }
    }

    fn forget_order_details(&mut self) {
        self.status = None;
        self.order_date = None;
        self.shipping_date = None;
        self.delivery_date = None;
        self.amount = None;
        self.img = None;
        self.price = None;
    }

    fn forget_product_description(&mut self) {
        self.name = None;
        self.brand = None;
        self.colour = None;
        self.description = None;
    }

    /// Drop order and product identity together with everything looked up for
    /// them. Attribute slots survive so they can seed a search.
    pub fn forget_identity(&mut self) {
        self.order_id = None;
        self.product_id = None;
        self.forget_order_details();
    }

    /// Rebuild `search_keywords` from the attribute slots.
    pub fn derive_search_keywords(&mut self) {
        self.search_keywords = self
            .attributes()
            .into_iter()
            .map(|(_, value)| value.trim().to_string())
            .collect();
    }

    /// Remove the slots describing a product that has just been ordered.
    pub fn clear_product(&mut self) {
        self.product_id = None;
        self.name = None;
        self.price = None;
        self.brand = None;
        self.colour = None;
        self.img = None;
        self.description = None;
        self.extra.remove("type");
    }

    /// `key: value` lines of every present slot, for prompts.
    pub fn to_prompt_lines(&self) -> String {
        let Ok(Value::Object(map)) = serde_json::to_value(self) else {
            return String::new();
        };
        map.into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<&OrderDetails> for RelevantData {
    fn from(order: &OrderDetails) -> Self {
        RelevantData {
            order_id: Some(order.order_id.to_string()),
            product_id: Some(order.product_id.clone()),
            name: Some(order.name.clone()),
            brand: order.brand.clone(),
            colour: order.colour.clone(),
            description: order.description.clone(),
            status: Some(order.status.clone()),
            order_date: order.order_date.clone(),
            shipping_date: order.shipping_date.clone(),
            delivery_date: order.delivery_date.clone(),
            amount: Some(order.amount),
            price: Some(order.price),
            img: order.img.clone(),
            ..Default::default()
        }
        .normalized()
    }
}

impl From<&ProductSummary> for RelevantData {
    fn from(product: &ProductSummary) -> Self {
        RelevantData {
            product_id: Some(product.p_id.clone()),
            name: Some(product.name.clone()),
            brand: product.brand.clone(),
            colour: product.colour.clone(),
            description: product.description.clone(),
            price: Some(product.price),
            img: product.img.clone(),
            ..Default::default()
        }
        .normalized()
    }
}

impl RelevantData {
    /// Blank database strings count as absent, same as on the wire.
    fn normalized(mut self) -> Self {
        for slot in [
            &mut self.order_id,
            &mut self.product_id,
            &mut self.name,
            &mut self.brand,
            &mut self.colour,
            &mut self.description,
            &mut self.status,
            &mut self.order_date,
            &mut self.shipping_date,
            &mut self.delivery_date,
            &mut self.img,
        ] {
            if slot.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *slot = None;
            }
        }
        self
    }
}

/// The slots a language model is asked to extract from one user message.
/// Anything else in the model's JSON is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedSlots {
    #[serde(default, deserialize_with = "slot_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub colour: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub fabric: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub occasion: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub print_pattern: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub top_type: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub sleeve_length: Option<String>,
    #[serde(default, deserialize_with = "slot_string")]
    pub description: Option<String>,
}

impl From<ExtractedSlots> for RelevantData {
    fn from(slots: ExtractedSlots) -> Self {
        RelevantData {
            order_id: slots.order_id,
            product_id: slots.product_id,
            name: slots.name,
            brand: slots.brand,
            colour: slots.colour,
            fabric: slots.fabric,
            occasion: slots.occasion,
            print_pattern: slots.print_pattern,
            top_type: slots.top_type,
            sleeve_length: slots.sleeve_length,
            description: slots.description,
            ..Default::default()
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Like `lenient_string`, but small models also write "null" or "none" for
/// slots they could not fill.
fn slot_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.filter(|s| {
        !matches!(
            s.to_lowercase().as_str(),
            "null" | "none" | "n/a" | "unknown" | "not specified"
        )
    }))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    })
}
