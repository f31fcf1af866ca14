use serde::{Deserialize, Serialize};

use super::{CallbackQuery, ChatMemberUpdated, Message, MessageReactionUpdated};

/// One incoming update. At most one of the optional fields is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reaction: Option<MessageReactionUpdated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<ChatMemberUpdated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<ChatMemberUpdated>,
}

impl Update {
    /// Name of the populated field, matching the `allowed_updates` vocabulary.
    pub fn kind(&self) -> &'static str {
        if self.message.is_some() {
            "message"
        } else if self.edited_message.is_some() {
            "edited_message"
        } else if self.channel_post.is_some() {
            "channel_post"
        } else if self.edited_channel_post.is_some() {
            "edited_channel_post"
        } else if self.message_reaction.is_some() {
            "message_reaction"
        } else if self.callback_query.is_some() {
            "callback_query"
        } else if self.my_chat_member.is_some() {
            "my_chat_member"
        } else if self.chat_member.is_some() {
            "chat_member"
        } else {
            "unknown"
        }
    }

    /// The message carried by any of the message-like fields.
    pub fn any_message(&self) -> Option<&Message> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .or(self.channel_post.as_ref())
            .or(self.edited_channel_post.as_ref())
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.any_message()
            .map(|m| m.chat.id)
            .or_else(|| self.message_reaction.as_ref().map(|r| r.chat.id))
            .or_else(|| self.my_chat_member.as_ref().map(|m| m.chat.id))
            .or_else(|| self.chat_member.as_ref().map(|m| m.chat.id))
            .or_else(|| {
                self.callback_query
                    .as_ref()
                    .and_then(|q| q.message.as_ref())
                    .map(|m| m.chat.id)
            })
    }
}
