//! Typed parameters for a representative subset of Bot API methods.

use serde::Serialize;

use crate::encode::Attachment;
use crate::error::DecodeError;
use crate::input_file::InputFile;
use crate::types::{
    BotCommand, BotCommandScope, ChatId, ChatMember, InputMedia, MenuButton, Message,
    ReactionType, ReplyMarkup, User, WebhookInfo,
};
use crate::variant::decode_slice;

/// Parameters of one remote method.
pub trait ApiMethod: Serialize + Send + Sync {
    type Response: Send;

    /// Remote method name, e.g. `sendMessage`.
    const NAME: &'static str;

    /// File parameters, located by JSON pointer into the serialized value.
    fn attachments(&self) -> Vec<Attachment<'_>> {
        Vec::new()
    }

    fn decode_result(raw: &[u8]) -> Result<Self::Response, DecodeError>;
}

fn plain<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(raw)?)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetMe {}

impl ApiMethod for GetMe {
    type Response = User;
    const NAME: &'static str = "getMe";

    fn decode_result(raw: &[u8]) -> Result<User, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            message_thread_id: None,
            parse_mode: None,
            disable_notification: None,
            reply_markup: None,
        }
    }

    pub fn with_parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }

    pub fn with_reply_markup(mut self, markup: impl Into<ReplyMarkup>) -> Self {
        self.reply_markup = Some(markup.into());
        self
    }
}

impl ApiMethod for SendMessage {
    type Response = Message;
    const NAME: &'static str = "sendMessage";

    fn decode_result(raw: &[u8]) -> Result<Message, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendPhoto {
    pub chat_id: ChatId,
    pub photo: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_spoiler: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendPhoto {
    pub fn new(chat_id: impl Into<ChatId>, photo: InputFile) -> Self {
        Self {
            chat_id: chat_id.into(),
            photo,
            caption: None,
            parse_mode: None,
            has_spoiler: None,
            reply_markup: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

impl ApiMethod for SendPhoto {
    type Response = Message;
    const NAME: &'static str = "sendPhoto";

    fn attachments(&self) -> Vec<Attachment<'_>> {
        vec![Attachment::new("/photo", &self.photo)]
    }

    fn decode_result(raw: &[u8]) -> Result<Message, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendDocument {
    pub chat_id: ChatId,
    pub document: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_content_type_detection: Option<bool>,
}

impl SendDocument {
    pub fn new(chat_id: impl Into<ChatId>, document: InputFile) -> Self {
        Self {
            chat_id: chat_id.into(),
            document,
            thumbnail: None,
            caption: None,
            disable_content_type_detection: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: InputFile) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }
}

impl ApiMethod for SendDocument {
    type Response = Message;
    const NAME: &'static str = "sendDocument";

    fn attachments(&self) -> Vec<Attachment<'_>> {
        let mut files = vec![Attachment::new("/document", &self.document)];
        if let Some(thumbnail) = &self.thumbnail {
            files.push(Attachment::new("/thumbnail", thumbnail));
        }
        files
    }

    fn decode_result(raw: &[u8]) -> Result<Message, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMediaGroup {
    pub chat_id: ChatId,
    pub media: Vec<InputMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

impl SendMediaGroup {
    pub fn new(chat_id: impl Into<ChatId>, media: Vec<InputMedia>) -> Self {
        Self {
            chat_id: chat_id.into(),
            media,
            disable_notification: None,
        }
    }
}

impl ApiMethod for SendMediaGroup {
    type Response = Vec<Message>;
    const NAME: &'static str = "sendMediaGroup";

    fn attachments(&self) -> Vec<Attachment<'_>> {
        self.media
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                item.files()
                    .into_iter()
                    .map(move |(field, file)| Attachment::new(format!("/media/{index}/{field}"), file))
            })
            .collect()
    }

    fn decode_result(raw: &[u8]) -> Result<Vec<Message>, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetChatMember {
    pub chat_id: ChatId,
    pub user_id: i64,
}

impl ApiMethod for GetChatMember {
    type Response = ChatMember;
    const NAME: &'static str = "getChatMember";

    fn decode_result(raw: &[u8]) -> Result<ChatMember, DecodeError> {
        decode_slice(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetMyCommands {
    pub commands: Vec<BotCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<BotCommandScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl ApiMethod for SetMyCommands {
    type Response = bool;
    const NAME: &'static str = "setMyCommands";

    fn decode_result(raw: &[u8]) -> Result<bool, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetChatMenuButton {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_button: Option<MenuButton>,
}

impl ApiMethod for SetChatMenuButton {
    type Response = bool;
    const NAME: &'static str = "setChatMenuButton";

    fn decode_result(raw: &[u8]) -> Result<bool, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetChatMenuButton {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
}

impl ApiMethod for GetChatMenuButton {
    type Response = MenuButton;
    const NAME: &'static str = "getChatMenuButton";

    fn decode_result(raw: &[u8]) -> Result<MenuButton, DecodeError> {
        decode_slice(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetMessageReaction {
    pub chat_id: ChatId,
    pub message_id: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reaction: Vec<ReactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_big: Option<bool>,
}

impl ApiMethod for SetMessageReaction {
    type Response = bool;
    const NAME: &'static str = "setMessageReaction";

    fn decode_result(raw: &[u8]) -> Result<bool, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetWebhook {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_pending_updates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl SetWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            certificate: None,
            max_connections: None,
            allowed_updates: Vec::new(),
            drop_pending_updates: None,
            secret_token: None,
        }
    }
}

impl ApiMethod for SetWebhook {
    type Response = bool;
    const NAME: &'static str = "setWebhook";

    fn attachments(&self) -> Vec<Attachment<'_>> {
        self.certificate
            .iter()
            .map(|certificate| Attachment::new("/certificate", certificate))
            .collect()
    }

    fn decode_result(raw: &[u8]) -> Result<bool, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteWebhook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_pending_updates: Option<bool>,
}

impl ApiMethod for DeleteWebhook {
    type Response = bool;
    const NAME: &'static str = "deleteWebhook";

    fn decode_result(raw: &[u8]) -> Result<bool, DecodeError> {
        plain(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetWebhookInfo {}

impl ApiMethod for GetWebhookInfo {
    type Response = WebhookInfo;
    const NAME: &'static str = "getWebhookInfo";

    fn decode_result(raw: &[u8]) -> Result<WebhookInfo, DecodeError> {
        plain(raw)
    }
}
