use serde_json::{Value, json};
use tgb_core::methods::{ApiMethod, GetChatMember, SendMediaGroup, SendMessage};
use tgb_core::types::{ChatMember, InputMedia, Update};
use tgb_core::{ApiEnvelope, BotError, DecodeError, InputFile, encode_request};

fn part_value<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    body.split(&format!("name=\"{name}\"\r\n\r\n"))
        .nth(1)
        .and_then(|rest| rest.split("\r\n").next())
}

#[test]
fn album_with_mixed_sources_is_one_multipart_request() {
    let params = SendMediaGroup::new(
        -100_123,
        vec![
            InputMedia::photo(InputFile::bytes("a.jpg", &b"JPEG-A"[..])).with_caption("first"),
            InputMedia::photo(InputFile::file_id("AgACAgIAAxkBAAIB")),
            InputMedia::document(InputFile::bytes("report.pdf", &b"%PDF-1.7"[..])),
        ],
    );

    let payload = encode_request(&params, &params.attachments()).expect("encode album");
    assert!(payload.is_multipart());
    let body = String::from_utf8(payload.body.to_vec()).expect("utf-8 body");

    assert_eq!(part_value(&body, "chat_id"), Some("-100123"));
    let media: Value = serde_json::from_str(part_value(&body, "media").expect("media part"))
        .expect("media is json");
    assert_eq!(
        media,
        json!([
            {"type": "photo", "media": "attach://media_0_media", "caption": "first"},
            {"type": "photo", "media": "AgACAgIAAxkBAAIB"},
            {"type": "document", "media": "attach://media_2_media"}
        ])
    );
    assert!(body.contains("name=\"media_0_media\"; filename=\"a.jpg\""));
    assert!(body.contains("name=\"media_2_media\"; filename=\"report.pdf\""));
    assert_eq!(body.matches("filename=").count(), 2);
}

#[test]
fn album_of_remote_files_stays_json() {
    let params = SendMediaGroup::new(
        7,
        vec![
            InputMedia::photo(InputFile::url("https://example.org/1.png")),
            InputMedia::photo(InputFile::url("https://example.org/2.png")),
        ],
    );
    let payload = encode_request(&params, &params.attachments()).expect("encode album");
    assert_eq!(payload.content_type, "application/json");
    let value: Value = serde_json::from_slice(&payload.body).expect("json body");
    assert_eq!(value["media"][1]["media"], "https://example.org/2.png");
}

#[test]
fn chat_member_update_resolves_both_members() {
    let raw = json!({
        "update_id": 900,
        "chat_member": {
            "chat": {"id": -100, "type": "supergroup", "title": "ops"},
            "from": {"id": 1, "is_bot": false, "first_name": "admin"},
            "date": 1_700_000_000,
            "old_chat_member": {"status": "left", "user": {"id": 2, "is_bot": false, "first_name": "u"}},
            "new_chat_member": {"status": "member", "user": {"id": 2, "is_bot": false, "first_name": "u"}}
        }
    });
    let update: Update = serde_json::from_value(raw).expect("decode update");
    assert_eq!(update.kind(), "chat_member");
    assert_eq!(update.chat_id(), Some(-100));

    let change = update.chat_member.expect("chat member change");
    assert!(matches!(change.old_chat_member, ChatMember::Left(_)));
    assert!(change.new_chat_member.is_present());
    assert_eq!(change.new_chat_member.user().id, 2);
}

#[test]
fn get_chat_member_rejects_unknown_status() {
    let err = GetChatMember::decode_result(
        br#"{"status":"superuser","user":{"id":2,"is_bot":false,"first_name":"u"}}"#,
    )
    .unwrap_err();
    match err {
        DecodeError::UnknownVariant {
            type_name,
            field,
            value,
        } => {
            assert_eq!(type_name, "ChatMember");
            assert_eq!(field, "status");
            assert_eq!(value, "superuser");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let wrapped = BotError::from(DecodeError::MissingResult);
    assert!(!wrapped.is_unknown_variant());
}

#[test]
fn sent_message_with_unknown_forward_origin_is_unknown_variant() {
    let result = br#"{"message_id":5,"date":1,"chat":{"id":42,"type":"private"},"text":"hi","forward_origin":{"type":"ghost","date":1}}"#;
    let err = SendMessage::decode_result(result).unwrap_err();
    match &err {
        DecodeError::UnknownVariant {
            type_name,
            field,
            value,
        } => {
            assert_eq!(*type_name, "MessageOrigin");
            assert_eq!(*field, "type");
            assert_eq!(value, "ghost");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // The same body through the envelope, as the client decodes it.
    let body = format!(r#"{{"ok":true,"result":{}}}"#, std::str::from_utf8(result).unwrap());
    let err = ApiEnvelope::parse(body.as_bytes())
        .unwrap()
        .into_result_with(SendMessage::decode_result)
        .unwrap_err();
    assert!(err.is_unknown_variant(), "{err:?}");
}

#[test]
fn sent_message_with_bad_field_is_still_malformed() {
    let err = SendMessage::decode_result(br#"{"message_id":"five","date":1,"chat":{"id":42,"type":"private"}}"#)
        .unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
    assert!(!BotError::from(err).is_unknown_variant());
}
