pub mod agents;
pub mod http;
pub mod store;
pub mod workflow;

pub use workflow::{Assistant, Node, TurnOutcome};
