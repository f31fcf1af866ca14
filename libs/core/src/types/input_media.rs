use serde::Serialize;

use crate::input_file::InputFile;

/// Media item of an album, selected by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMedia {
    Photo(InputMediaPhoto),
    Video(InputMediaVideo),
    Audio(InputMediaAudio),
    Document(InputMediaDocument),
    Animation(InputMediaAnimation),
}

impl InputMedia {
    pub fn kind(&self) -> &'static str {
        match self {
            InputMedia::Photo(_) => "photo",
            InputMedia::Video(_) => "video",
            InputMedia::Audio(_) => "audio",
            InputMedia::Document(_) => "document",
            InputMedia::Animation(_) => "animation",
        }
    }

    pub fn photo(media: InputFile) -> Self {
        InputMedia::Photo(InputMediaPhoto {
            media,
            caption: None,
            parse_mode: None,
            has_spoiler: None,
        })
    }

    pub fn document(media: InputFile) -> Self {
        InputMedia::Document(InputMediaDocument {
            media,
            thumbnail: None,
            caption: None,
            parse_mode: None,
            disable_content_type_detection: None,
        })
    }

    /// File fields of this item keyed by their JSON field name.
    pub fn files(&self) -> Vec<(&'static str, &InputFile)> {
        let (media, thumbnail) = match self {
            InputMedia::Photo(m) => (&m.media, None),
            InputMedia::Video(m) => (&m.media, m.thumbnail.as_ref()),
            InputMedia::Audio(m) => (&m.media, m.thumbnail.as_ref()),
            InputMedia::Document(m) => (&m.media, m.thumbnail.as_ref()),
            InputMedia::Animation(m) => (&m.media, m.thumbnail.as_ref()),
        };
        let mut files = vec![("media", media)];
        if let Some(thumbnail) = thumbnail {
            files.push(("thumbnail", thumbnail));
        }
        files
    }

    pub fn with_caption(mut self, text: impl Into<String>) -> Self {
        let caption = Some(text.into());
        match &mut self {
            InputMedia::Photo(m) => m.caption = caption,
            InputMedia::Video(m) => m.caption = caption,
            InputMedia::Audio(m) => m.caption = caption,
            InputMedia::Document(m) => m.caption = caption,
            InputMedia::Animation(m) => m.caption = caption,
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMediaPhoto {
    pub media: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_spoiler: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMediaVideo {
    pub media: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_streaming: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMediaAudio {
    pub media: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMediaDocument {
    pub media: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_content_type_detection: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMediaAnimation {
    pub media: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}
