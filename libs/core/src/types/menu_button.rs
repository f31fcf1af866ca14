use serde::{Deserialize, Deserializer, Serialize};

use crate::variant::{deserialize_tagged, variant_from, TaggedUnion, Variant};

/// Bot menu button of a private chat, selected by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuButton {
    Commands(MenuButtonCommands),
    WebApp(MenuButtonWebApp),
    Default(MenuButtonDefault),
}

impl TaggedUnion for MenuButton {
    const TYPE_NAME: &'static str = "MenuButton";
    const TAG_FIELD: &'static str = "type";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant::new("commands", |v| variant_from(v, MenuButton::Commands)),
        Variant::new("web_app", |v| variant_from(v, MenuButton::WebApp)),
        Variant::new("default", |v| variant_from(v, MenuButton::Default)),
    ];

    fn tag(&self) -> &'static str {
        match self {
            MenuButton::Commands(_) => "commands",
            MenuButton::WebApp(_) => "web_app",
            MenuButton::Default(_) => "default",
        }
    }
}

impl<'de> Deserialize<'de> for MenuButton {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_tagged(deserializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuButtonCommands {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuButtonDefault {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuButtonWebApp {
    pub text: String,
    pub web_app: WebAppInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAppInfo {
    pub url: String,
}
