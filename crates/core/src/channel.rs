//! Channel trait — the abstraction over the chat transport.
//!
//! A Channel connects MotoAsesor to a messaging platform (WhatsApp through a
//! bridge, or the local terminal). It delivers inbound events and sends text
//! and presence updates back. Connection lifecycle, credentials and pairing
//! belong to the transport, not to the relay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// JID suffix of WhatsApp group chats.
pub const GROUP_SUFFIX: &str = "@g.us";

/// JID marker of broadcast lists and status updates.
pub const BROADCAST_MARKER: &str = "@broadcast";

/// What kind of upsert the transport is reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A new message just arrived
    Notify,
    /// History sync or a message appended from another device
    Append,
    /// Anything the transport adds later
    Other(String),
}

impl EventKind {
    /// Parse the transport's kind tag. Unknown tags are kept verbatim.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "notify" => Self::Notify,
            "append" => Self::Append,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Notify => "notify",
            Self::Append => "append",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One message inside an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation identity (the WhatsApp JID of the chat)
    pub remote_jid: String,

    /// Whether the bot's own account sent this message
    #[serde(default)]
    pub from_me: bool,

    /// Display name the sender chose, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,

    /// Plain-text body; `None` for media, reactions, stickers and the like
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Transport message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InboundMessage {
    /// A plain-text direct message from `remote_jid`.
    pub fn text(remote_jid: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            remote_jid: remote_jid.into(),
            from_me: false,
            push_name: None,
            text: Some(text.into()),
            id: None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.remote_jid.contains(GROUP_SUFFIX)
    }

    pub fn is_broadcast(&self) -> bool {
        self.remote_jid.contains(BROADCAST_MARKER)
    }

    /// The text body, if it carries anything besides whitespace.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A batch of messages delivered by the transport in one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub messages: Vec<InboundMessage>,
}

impl InboundEvent {
    /// A `notify` event carrying a single message.
    pub fn notify(message: InboundMessage) -> Self {
        Self {
            kind: EventKind::Notify,
            messages: vec![message],
        }
    }
}

/// Typing indicator states the relay signals around generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Composing,
    Paused,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Composing => "composing",
            Presence::Paused => "paused",
        }
    }
}

/// The core Channel trait.
///
/// Outbound calls are fire-and-forget from the relay's point of view: the
/// router logs failures and never retries them.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "whatsapp", "cli").
    fn name(&self) -> &str;

    /// Start listening for inbound events.
    ///
    /// Returns a receiver that yields events. The implementation handles
    /// webhooks or terminal input internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<InboundEvent, ChannelError>>,
        ChannelError,
    >;

    /// Send a text message to a conversation.
    async fn send_text(&self, recipient: &str, text: &str) -> std::result::Result<(), ChannelError>;

    /// Update the typing indicator (if the platform supports it).
    async fn set_presence(
        &self,
        _recipient: &str,
        _presence: Presence,
    ) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}
