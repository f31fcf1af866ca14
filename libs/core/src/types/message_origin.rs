use serde::{Deserialize, Deserializer, Serialize};

use super::{Chat, User};
use crate::variant::{deserialize_tagged, variant_from, TaggedUnion, Variant};

/// Where a forwarded message originally came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOrigin {
    User(OriginUser),
    HiddenUser(OriginHiddenUser),
    Chat(OriginChat),
    Channel(OriginChannel),
}

impl MessageOrigin {
    pub fn date(&self) -> i64 {
        match self {
            MessageOrigin::User(o) => o.date,
            MessageOrigin::HiddenUser(o) => o.date,
            MessageOrigin::Chat(o) => o.date,
            MessageOrigin::Channel(o) => o.date,
        }
    }
}

impl TaggedUnion for MessageOrigin {
    const TYPE_NAME: &'static str = "MessageOrigin";
    const TAG_FIELD: &'static str = "type";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant::new("user", |v| variant_from(v, MessageOrigin::User)),
        Variant::new("hidden_user", |v| variant_from(v, MessageOrigin::HiddenUser)),
        Variant::new("chat", |v| variant_from(v, MessageOrigin::Chat)),
        Variant::new("channel", |v| variant_from(v, MessageOrigin::Channel)),
    ];

    fn tag(&self) -> &'static str {
        match self {
            MessageOrigin::User(_) => "user",
            MessageOrigin::HiddenUser(_) => "hidden_user",
            MessageOrigin::Chat(_) => "chat",
            MessageOrigin::Channel(_) => "channel",
        }
    }
}

impl<'de> Deserialize<'de> for MessageOrigin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_tagged(deserializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginUser {
    pub date: i64,
    pub sender_user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginHiddenUser {
    pub date: i64,
    pub sender_user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginChat {
    pub date: i64,
    pub sender_chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginChannel {
    pub date: i64,
    pub chat: Chat,
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_signature: Option<String>,
}
