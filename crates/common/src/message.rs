//! Wire-level message types shared by the server and the client session core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of messages per page. Shared by the paginated read endpoint and
/// the reconnection resync so cursor semantics stay consistent.
pub const MESSAGE_BATCH: u64 = 10;

/// One chat post as it travels over the wire.
///
/// `id` is immutable and unique within the topic's log; edits and deletes
/// mutate the same entity. Feed order is `(created_at desc, id desc)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub topic_id: String,
    pub author_id: String,
    pub content: String,
    pub attachment_url: Option<String>,
    /// Tombstone flag; a deleted message keeps its position in the feed.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Whether this message has been edited after creation.
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }

    /// Kind of the attachment, inferred from its URL.
    #[must_use]
    pub fn attachment_kind(&self) -> Option<AttachmentKind> {
        self.attachment_url.as_deref().map(AttachmentKind::from_url)
    }
}

/// One page of a topic's feed, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub items: Vec<Message>,
    /// Id of the last item iff the page was full; `None` signals
    /// end-of-history.
    pub next_cursor: Option<String>,
}

/// Message lifecycle event carried over the event channel.
///
/// A closed set: the client merge logic is exhaustively defined over
/// exactly these three kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum MessageEvent {
    /// A new message was posted.
    Created(Message),
    /// An existing message was edited.
    Updated(Message),
    /// A message was tombstoned.
    Deleted(Message),
}

impl MessageEvent {
    /// The message state carried by this event.
    #[must_use]
    pub const fn message(&self) -> &Message {
        match self {
            Self::Created(m) | Self::Updated(m) | Self::Deleted(m) => m,
        }
    }

    /// The topic this event belongs to.
    #[must_use]
    pub fn topic_id(&self) -> &str {
        &self.message().topic_id
    }
}

/// Display category of an attachment, inferred from the upload URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Pdf,
    File,
}

impl AttachmentKind {
    /// Infer the kind from a URL's file extension.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" => Self::Image,
            "mp4" | "webm" | "mov" => Self::Video,
            "pdf" => Self::Pdf,
            _ => Self::File,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        let at = Utc::now();
        Message {
            id: "01hq3ka9vq0000000000000000".to_string(),
            topic_id: "channel-1".to_string(),
            author_id: "member-1".to_string(),
            content: "hello".to_string(),
            attachment_url: None,
            deleted: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let json = serde_json::to_string(&sample_message()).unwrap();
        assert!(json.contains("\"topicId\":\"channel-1\""));
        assert!(json.contains("\"authorId\":\"member-1\""));
        assert!(json.contains("\"attachmentUrl\":null"));
    }

    #[test]
    fn test_event_tagged_representation() {
        let event = MessageEvent::Created(sample_message());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"created\""));

        let parsed: MessageEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, MessageEvent::Created(_)));
    }

    #[test]
    fn test_edited_flag() {
        let mut msg = sample_message();
        assert!(!msg.is_edited());
        msg.updated_at = msg.created_at + chrono::Duration::seconds(5);
        assert!(msg.is_edited());
    }

    #[test]
    fn test_attachment_kind_inference() {
        assert_eq!(AttachmentKind::from_url("https://x/y.png"), AttachmentKind::Image);
        assert_eq!(
            AttachmentKind::from_url("https://x/y.PDF?sig=abc"),
            AttachmentKind::Pdf
        );
        assert_eq!(AttachmentKind::from_url("https://x/y.mp4"), AttachmentKind::Video);
        assert_eq!(AttachmentKind::from_url("https://x/blob"), AttachmentKind::File);
    }
}
