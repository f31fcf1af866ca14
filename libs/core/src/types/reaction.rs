use serde::{Deserialize, Deserializer, Serialize};

use super::{Chat, User};
use crate::variant::{deserialize_tagged, variant_from, TaggedUnion, Variant};

/// A reaction attached to a message, selected by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionType {
    Emoji(ReactionEmoji),
    CustomEmoji(ReactionCustomEmoji),
    Paid(ReactionPaid),
}

impl ReactionType {
    pub fn emoji(emoji: impl Into<String>) -> Self {
        ReactionType::Emoji(ReactionEmoji {
            emoji: emoji.into(),
        })
    }
}

impl TaggedUnion for ReactionType {
    const TYPE_NAME: &'static str = "ReactionType";
    const TAG_FIELD: &'static str = "type";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant::new("emoji", |v| variant_from(v, ReactionType::Emoji)),
        Variant::new("custom_emoji", |v| variant_from(v, ReactionType::CustomEmoji)),
        Variant::new("paid", |v| variant_from(v, ReactionType::Paid)),
    ];

    fn tag(&self) -> &'static str {
        match self {
            ReactionType::Emoji(_) => "emoji",
            ReactionType::CustomEmoji(_) => "custom_emoji",
            ReactionType::Paid(_) => "paid",
        }
    }
}

impl<'de> Deserialize<'de> for ReactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_tagged(deserializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEmoji {
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCustomEmoji {
    pub custom_emoji_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPaid {}

/// Reactions on a message changed, delivered as `message_reaction` updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReactionUpdated {
    pub chat: Chat,
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_chat: Option<Chat>,
    pub date: i64,
    pub old_reaction: Vec<ReactionType>,
    pub new_reaction: Vec<ReactionType>,
}
