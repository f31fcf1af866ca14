//! Discriminator driven decoding for closed sum types.
//!
//! A sum type lists every accepted discriminator value in a static table.
//! Decoding first reads only the discriminator, then decodes the whole
//! payload into the variant the table selects. A value missing from the
//! table is an error; there is no fallback variant.

use std::cell::RefCell;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Decodes a full payload into one variant of `T`.
pub type DecodeFn<T> = fn(Value) -> serde_json::Result<T>;

/// One row of a variant registry.
pub struct Variant<T> {
    pub tag: &'static str,
    pub decode: DecodeFn<T>,
}

impl<T> Variant<T> {
    pub const fn new(tag: &'static str, decode: DecodeFn<T>) -> Self {
        Self { tag, decode }
    }
}

/// A closed set of shapes sharing one discriminator field.
pub trait TaggedUnion: Sized + 'static {
    /// Name used in error messages.
    const TYPE_NAME: &'static str;
    /// Field holding the discriminator, usually `status` or `type`.
    const TAG_FIELD: &'static str;
    /// Every accepted discriminator value.
    const VARIANTS: &'static [Variant<Self>];

    /// Discriminator value of this instance.
    fn tag(&self) -> &'static str;
}

/// Decodes `payload` into `T` through its registry.
pub fn decode_value<T: TaggedUnion>(payload: Value) -> Result<T, DecodeError> {
    let tag = peek_tag::<T>(&payload)?;
    let variant = T::VARIANTS
        .iter()
        .find(|variant| variant.tag == tag)
        .ok_or_else(|| DecodeError::UnknownVariant {
            type_name: T::TYPE_NAME,
            field: T::TAG_FIELD,
            value: tag.to_string(),
        })?;
    Ok((variant.decode)(payload)?)
}

/// Same as [`decode_value`] starting from raw bytes.
pub fn decode_slice<T: TaggedUnion>(raw: &[u8]) -> Result<T, DecodeError> {
    let payload: Value = serde_json::from_slice(raw)?;
    decode_value(payload)
}

/// Serde entry point for `impl Deserialize for T`, so tagged fields nested in
/// other structs resolve through the same registry.
pub fn deserialize_tagged<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TaggedUnion,
{
    let payload = Value::deserialize(deserializer)?;
    decode_value(payload).map_err(|err| match err {
        DecodeError::Malformed(inner) => D::Error::custom(inner),
        parked => {
            let custom = D::Error::custom(&parked);
            NESTED_FAILURE.with(|slot| *slot.borrow_mut() = Some(parked));
            custom
        }
    })
}

thread_local! {
    // Last discriminator failure raised inside a serde derived parent. Serde
    // only carries a message across its boundary, so the structured error is
    // parked here until the outer `serde_json::Error` is converted.
    static NESTED_FAILURE: RefCell<Option<DecodeError>> = const { RefCell::new(None) };
}

/// Takes the parked discriminator failure if `err` is the one it produced.
pub(crate) fn take_nested_failure(err: &serde_json::Error) -> Option<DecodeError> {
    let parked = NESTED_FAILURE.with(|slot| slot.borrow_mut().take())?;
    err.to_string().contains(&parked.to_string()).then_some(parked)
}

/// Decode helper used by registry rows.
pub fn variant_from<V, T>(payload: Value, wrap: fn(V) -> T) -> serde_json::Result<T>
where
    V: DeserializeOwned,
{
    serde_json::from_value(payload).map(wrap)
}

fn peek_tag<T: TaggedUnion>(payload: &Value) -> Result<&str, DecodeError> {
    payload
        .get(T::TAG_FIELD)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingDiscriminator {
            type_name: T::TYPE_NAME,
            field: T::TAG_FIELD,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Circle {
        radius: u32,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Square {
        side: u32,
    }

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    impl TaggedUnion for Shape {
        const TYPE_NAME: &'static str = "Shape";
        const TAG_FIELD: &'static str = "kind";
        const VARIANTS: &'static [Variant<Self>] = &[
            Variant::new("circle", |v| variant_from(v, Shape::Circle)),
            Variant::new("square", |v| variant_from(v, Shape::Square)),
        ];

        fn tag(&self) -> &'static str {
            match self {
                Shape::Circle(_) => "circle",
                Shape::Square(_) => "square",
            }
        }
    }

    #[test]
    fn selects_variant_from_registry() {
        let shape: Shape = decode_value(json!({"kind": "square", "side": 3})).unwrap();
        assert_eq!(shape, Shape::Square(Square { side: 3 }));
        assert_eq!(shape.tag(), "square");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = decode_slice::<Shape>(br#"{"kind":"triangle","side":3}"#).unwrap_err();
        match err {
            DecodeError::UnknownVariant { field, value, .. } => {
                assert_eq!(field, "kind");
                assert_eq!(value, "triangle");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_tag_is_rejected() {
        let err = decode_value::<Shape>(json!({"radius": 1})).unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator { .. }));
    }

    #[derive(Debug, Deserialize)]
    struct Drawing {
        #[allow(dead_code)]
        title: String,
        #[allow(dead_code)]
        shapes: Vec<Shape>,
    }

    impl<'de> Deserialize<'de> for Shape {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserialize_tagged(deserializer)
        }
    }

    #[test]
    fn nested_unknown_tag_keeps_its_kind() {
        let raw = br#"{"title":"t","shapes":[{"kind":"circle","radius":1},{"kind":"hexagon"}]}"#;
        let err = DecodeError::from(serde_json::from_slice::<Drawing>(raw).unwrap_err());
        match err {
            DecodeError::UnknownVariant {
                type_name,
                field,
                value,
            } => {
                assert_eq!(type_name, "Shape");
                assert_eq!(field, "kind");
                assert_eq!(value, "hexagon");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nested_missing_tag_keeps_its_kind() {
        let raw = br#"{"title":"t","shapes":[{"radius":1}]}"#;
        let err = DecodeError::from(serde_json::from_slice::<Drawing>(raw).unwrap_err());
        assert!(matches!(err, DecodeError::MissingDiscriminator { type_name: "Shape", .. }));
    }

    #[test]
    fn unrelated_failure_after_nested_one_stays_malformed() {
        let raw = br#"{"title":"t","shapes":[{"kind":"hexagon"}]}"#;
        let _dropped = serde_json::from_slice::<Drawing>(raw).unwrap_err();
        let unrelated = serde_json::from_slice::<Drawing>(br#"{"title":1,"shapes":[]}"#).unwrap_err();
        assert!(matches!(DecodeError::from(unrelated), DecodeError::Malformed(_)));
    }

    #[test]
    fn variant_fields_are_still_validated() {
        let err = decode_value::<Shape>(json!({"kind": "circle"})).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
