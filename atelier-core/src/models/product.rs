use serde::{Deserialize, Serialize};

/// The columns shown to shoppers: detail lookups and recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProductSummary {
    pub p_id: String,
    pub name: String,
    pub price: f64,
    pub colour: Option<String>,
    pub brand: Option<String>,
    pub img: Option<String>,
    pub description: Option<String>,
}

impl ProductSummary {
    /// One line for prompts: name, brand, id, a short description and the price.
    pub fn headline(&self) -> String {
        let description: String = self
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(50)
            .collect();
        format!(
            "{} by {} (ID: {}): {}... Price: {}",
            self.name,
            self.brand.as_deref().unwrap_or("Unknown"),
            self.p_id,
            description.trim_end(),
            self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_truncates_description() {
        let summary = ProductSummary {
            p_id: "1020".to_string(),
            name: "Floral Kurta".to_string(),
            price: 1299.0,
            colour: Some("red".to_string()),
            brand: None,
            img: None,
            description: Some("x".repeat(120)),
        };
        let line = summary.headline();
        assert!(line.starts_with("Floral Kurta by Unknown (ID: 1020): "));
        assert!(line.contains(&format!("{}...", "x".repeat(50))));
        assert!(line.ends_with("Price: 1299"));
    }
}
