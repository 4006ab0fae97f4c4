use serde::{Deserialize, Serialize};

/// Purpose of a user turn, as decided by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Order or product information: status, dates, price, image.
    Details,
    Recommendation,
    Billing,
    #[default]
    None,
}

impl Intent {
    /// Normalise a free-text model label. Order matters: "order details" is
    /// `Details`, "recommend a product" is `Recommendation`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("recommend") || label.contains("suggest") {
            Intent::Recommendation
        } else if ["bill", "buy", "pay", "checkout", "purchase"]
            .iter()
            .any(|k| label.contains(k))
        {
            Intent::Billing
        } else if ["detail", "order", "product"].iter().any(|k| label.contains(k)) {
            Intent::Details
        } else {
            Intent::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Details => "details",
            Intent::Recommendation => "recommendation",
            Intent::Billing => "billing",
            Intent::None => "none",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
