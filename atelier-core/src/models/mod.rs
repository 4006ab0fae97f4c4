pub mod intent;
pub mod message;
pub mod order;
pub mod product;
pub mod relevant;
pub mod user;

pub use intent::Intent;
pub use message::ChatMessage;
pub use order::OrderDetails;
pub use product::ProductSummary;
pub use relevant::{ExtractedSlots, RelevantData};
pub use user::User;
