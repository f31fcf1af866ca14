use serde::{Deserialize, Deserializer, Serialize};

use super::ChatId;
use crate::variant::{deserialize_tagged, variant_from, TaggedUnion, Variant};

/// Set of users a list of bot commands applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BotCommandScope {
    Default(ScopeAll),
    AllPrivateChats(ScopeAll),
    AllGroupChats(ScopeAll),
    AllChatAdministrators(ScopeAll),
    Chat(ScopeChat),
    ChatAdministrators(ScopeChat),
    ChatMember(ScopeChatMember),
}

impl BotCommandScope {
    pub fn chat(chat_id: impl Into<ChatId>) -> Self {
        BotCommandScope::Chat(ScopeChat {
            chat_id: chat_id.into(),
        })
    }
}

impl Default for BotCommandScope {
    fn default() -> Self {
        BotCommandScope::Default(ScopeAll {})
    }
}

impl TaggedUnion for BotCommandScope {
    const TYPE_NAME: &'static str = "BotCommandScope";
    const TAG_FIELD: &'static str = "type";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant::new("default", |v| variant_from(v, BotCommandScope::Default)),
        Variant::new("all_private_chats", |v| {
            variant_from(v, BotCommandScope::AllPrivateChats)
        }),
        Variant::new("all_group_chats", |v| {
            variant_from(v, BotCommandScope::AllGroupChats)
        }),
        Variant::new("all_chat_administrators", |v| {
            variant_from(v, BotCommandScope::AllChatAdministrators)
        }),
        Variant::new("chat", |v| variant_from(v, BotCommandScope::Chat)),
        Variant::new("chat_administrators", |v| {
            variant_from(v, BotCommandScope::ChatAdministrators)
        }),
        Variant::new("chat_member", |v| variant_from(v, BotCommandScope::ChatMember)),
    ];

    fn tag(&self) -> &'static str {
        match self {
            BotCommandScope::Default(_) => "default",
            BotCommandScope::AllPrivateChats(_) => "all_private_chats",
            BotCommandScope::AllGroupChats(_) => "all_group_chats",
            BotCommandScope::AllChatAdministrators(_) => "all_chat_administrators",
            BotCommandScope::Chat(_) => "chat",
            BotCommandScope::ChatAdministrators(_) => "chat_administrators",
            BotCommandScope::ChatMember(_) => "chat_member",
        }
    }
}

impl<'de> Deserialize<'de> for BotCommandScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_tagged(deserializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeAll {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeChat {
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeChatMember {
    pub chat_id: ChatId,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_scope_round_trips_with_username() {
        let scope = BotCommandScope::chat("@rustlang");
        let value = serde_json::to_value(&scope).unwrap();
        assert_eq!(value, json!({"type": "chat", "chat_id": "@rustlang"}));
        assert_eq!(serde_json::from_value::<BotCommandScope>(value).unwrap(), scope);
    }

    #[test]
    fn scopes_sharing_a_shape_keep_their_tag() {
        let value = json!({"type": "all_group_chats"});
        let scope: BotCommandScope = serde_json::from_value(value).unwrap();
        assert_eq!(scope.tag(), "all_group_chats");
    }
}
