//! Wire types for the Telegram Bot API and the adapter's domain model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Telegram wire types (subset of fields the adapter consumes)
// ---------------------------------------------------------------------------

/// Generic Telegram Bot API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Method result, present when `ok` is true.
    pub result: Option<T>,
    /// Human-readable error, present when `ok` is false.
    pub description: Option<String>,
}

/// One inbound event from the update stream.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonically increasing stream position.
    pub update_id: i64,
    /// A new message.
    pub message: Option<Message>,
    /// An edit to an existing message.
    pub edited_message: Option<Message>,
    /// An inline-keyboard callback press.
    pub callback_query: Option<CallbackQuery>,
}

/// Telegram `Message` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message id within the chat; the de-duplication key.
    pub message_id: i64,
    /// Sender. Absent for channel posts and some service messages.
    pub from: Option<User>,
    /// Chat the message was posted in.
    pub chat: Chat,
    /// Plain message text.
    pub text: Option<String>,
    /// Service payload: a member joined the chat.
    pub new_chat_member: Option<User>,
    /// Service payload: a member left the chat.
    pub left_chat_member: Option<User>,
    /// Service payload: the chat title changed.
    pub new_chat_title: Option<String>,
    /// Fields the adapter has no typed mapping for; carried through into
    /// catch-all events untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Telegram `Chat` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat id. Positive for private chats, negative for groups.
    pub id: i64,
    /// Chat type: `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Title, for group chats.
    pub title: Option<String>,
}

/// Telegram `User` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Platform-assigned user id.
    pub id: i64,
    /// Public @-handle, if the user has one.
    pub username: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
}

/// Telegram `CallbackQuery` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query id, used to acknowledge the press.
    pub id: String,
    /// User who pressed the button.
    pub from: User,
    /// Data attached to the pressed button.
    pub data: Option<String>,
    /// The message the keyboard was attached to.
    pub message: Option<Box<Message>>,
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A platform user enriched with the chat it was last observed in.
///
/// Mutable: superseded wholesale in the identity store when any of the
/// first name, last name or username differs from the cached copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUser {
    /// Platform-assigned user id; the identity-store key.
    pub id: i64,
    /// Public @-handle.
    pub username: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Room (chat id) the user was last seen in.
    pub room: Option<i64>,
    /// Full chat object the user was last seen in.
    pub chat: Option<Chat>,
}

impl RemoteUser {
    /// Build a domain user from a wire user and the chat it appeared in.
    pub fn from_wire(user: &User, chat: &Chat) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            room: Some(chat.id),
            chat: Some(chat.clone()),
        }
    }

    /// Byte-exact profile fingerprint used to decide supersession.
    ///
    /// Concatenation of first name, last name and username, with absent
    /// fields contributing nothing. No normalization.
    pub fn profile_fingerprint(&self) -> String {
        format!(
            "{}{}{}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default(),
            self.username.as_deref().unwrap_or_default(),
        )
    }
}

/// A classified inbound update, handed to the host framework.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Plain text, or callback-query data normalized to text.
    Text {
        /// Resolved sender.
        user: RemoteUser,
        /// Normalized message text (see `classify::clean_message_text`).
        text: String,
        /// Platform message id.
        message_id: i64,
    },
    /// A member joined the chat.
    Enter {
        /// Resolved member.
        user: RemoteUser,
        /// Platform message id of the service message.
        message_id: i64,
    },
    /// A member left the chat.
    Leave {
        /// Resolved member.
        user: RemoteUser,
        /// Platform message id of the service message.
        message_id: i64,
    },
    /// The chat title changed.
    Topic {
        /// Resolved user who changed the title.
        user: RemoteUser,
        /// New chat title.
        title: String,
        /// Platform message id of the service message.
        message_id: i64,
    },
    /// A payload the classifier has no typed mapping for.
    CatchAll {
        /// Resolved sender, when the payload named one.
        user: Option<RemoteUser>,
        /// The raw payload as received.
        raw: Value,
        /// Platform message id.
        message_id: i64,
    },
}

impl InboundEvent {
    /// The platform message id this event was classified from.
    pub fn message_id(&self) -> i64 {
        match self {
            Self::Text { message_id, .. }
            | Self::Enter { message_id, .. }
            | Self::Leave { message_id, .. }
            | Self::Topic { message_id, .. }
            | Self::CatchAll { message_id, .. } => *message_id,
        }
    }
}

/// An outbound delivery request.
#[derive(Debug, Clone, Default)]
pub struct OutboundEnvelope {
    /// Destination room (chat id).
    pub room: i64,
    /// Message id that replies should target.
    pub message_id: Option<i64>,
    /// Platform-specific extras shallow-merged onto the payload before
    /// delivery. Extras always win over derived fields.
    pub extra: Option<Map<String, Value>>,
}

/// A broadcast destination drawn from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Room (chat id).
    pub id: i64,
    /// Display name, matched by broadcast rules.
    pub name: String,
}
