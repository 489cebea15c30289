//! Topic classification.

use sensbox_core::events::{TOPIC_CONNECTED, TOPIC_DISCONNECTED, TOPIC_MESSAGE};

/// What an inbound publish is, judged by its topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicClass {
    /// `agent/connected`: an announcement, observed only.
    ConnectAnnouncement,
    /// `agent/disconnected`: an announcement, observed only.
    DisconnectAnnouncement,
    /// `agent/message`: device telemetry, routed.
    ApplicationMessage,
    /// Anything else, ignored by the overlay.
    Other,
}

impl TopicClass {
    /// Classify a topic string.
    pub fn classify(topic: &str) -> Self {
        match topic {
            TOPIC_CONNECTED => Self::ConnectAnnouncement,
            TOPIC_DISCONNECTED => Self::DisconnectAnnouncement,
            TOPIC_MESSAGE => Self::ApplicationMessage,
            _ => Self::Other,
        }
    }

    /// Whether the topic is one of the overlay's own announcements.
    pub fn is_announcement(self) -> bool {
        matches!(self, Self::ConnectAnnouncement | Self::DisconnectAnnouncement)
    }
}
