use serde::{Deserialize, Serialize};

/// An order joined with its product, as answered to "where is my order".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderDetails {
    pub order_id: i64,
    pub product_id: String,
    pub user_id: i64,
    pub status: String,
    pub order_date: Option<String>,
    pub shipping_date: Option<String>,
    pub delivery_date: Option<String>,
    pub amount: f64,
    pub name: String,
    pub price: f64,
    pub brand: Option<String>,
    pub colour: Option<String>,
    pub img: Option<String>,
    pub description: Option<String>,
}
