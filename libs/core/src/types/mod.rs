//! Wire types exchanged with the Bot API.

mod chat;
mod chat_member;
mod command_scope;
mod input_media;
mod menu_button;
mod message;
mod message_origin;
mod reaction;
mod reply_markup;
mod update;

pub use chat::*;
pub use chat_member::*;
pub use command_scope::*;
pub use input_media::*;
pub use menu_button::*;
pub use message::*;
pub use message_origin::*;
pub use reaction::*;
pub use reply_markup::*;
pub use update::*;
