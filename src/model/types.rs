//! Normalized message entity structs.

use serde::{Deserialize, Serialize};

/// Marker prefix carried by the display name of a topic that has been
/// marked resolved.
pub const RESOLVED_TOPIC_PREFIX: &str = "\u{2714} ";

/// Where a message was sent: a stream/topic pair or a direct-message
/// conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    Stream {
        stream_id: u64,
        stream_name: String,
        topic: String,
    },
    /// `user_ids` is the full participant set, sender included.
    Direct { user_ids: Vec<u64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender_id: u64,
    #[serde(flatten)]
    pub recipient: Recipient,
    /// Server-rendered HTML content.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub mentioned: bool,
    #[serde(default)]
    pub alerted: bool,
    #[serde(default)]
    pub unread: bool,
    /// Rendered client-side but not yet acknowledged by the server.
    #[serde(default)]
    pub locally_echoed: bool,
}

impl Message {
    pub fn is_direct(&self) -> bool {
        matches!(self.recipient, Recipient::Direct { .. })
    }

    pub fn stream_id(&self) -> Option<u64> {
        match &self.recipient {
            Recipient::Stream { stream_id, .. } => Some(*stream_id),
            Recipient::Direct { .. } => None,
        }
    }

    pub fn stream_name(&self) -> Option<&str> {
        match &self.recipient {
            Recipient::Stream { stream_name, .. } => Some(stream_name),
            Recipient::Direct { .. } => None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match &self.recipient {
            Recipient::Stream { topic, .. } => Some(topic),
            Recipient::Direct { .. } => None,
        }
    }

    /// True for stream messages whose topic carries the resolved marker.
    pub fn topic_resolved(&self) -> bool {
        self.topic()
            .is_some_and(|topic| topic.starts_with(RESOLVED_TOPIC_PREFIX))
    }
}
