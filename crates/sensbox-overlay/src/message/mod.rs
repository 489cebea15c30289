//! Inbound message classification and payload parsing.

pub mod payload;
pub mod topic;

pub use payload::{AgentMessage, Metric, ParseError, ParsedMessage, parse_agent_message, parse_payload};
pub use topic::TopicClass;
