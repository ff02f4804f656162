//! JSON codec. JSON has no tags, so the resource type travels as the
//! ordinary key `!type`.

use std::collections::BTreeMap;

use serde_json::{Map, Number};

use crate::entity::charset::{self, UTF_8};
use crate::entity::codec::{Codec, CodecContext};
use crate::error::CodecError;
use crate::resource::{Resource, Value, TYPE_KEY};

const FORMAT: &str = "JSON";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn parse(
        &self,
        body: &[u8],
        charset: Option<&str>,
        _cx: &CodecContext<'_>,
    ) -> Result<Value, CodecError> {
        let text = charset::decode(body, charset.unwrap_or(UTF_8))?;
        let parsed: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| CodecError::malformed(FORMAT, e))?;
        from_json(parsed)
    }

    fn format(
        &self,
        value: &Value,
        charset: &str,
        _cx: &CodecContext<'_>,
    ) -> Result<Vec<u8>, CodecError> {
        let text = serde_json::to_string(&to_json(value)?)
            .map_err(|e| CodecError::format(FORMAT, e))?;
        charset::encode(&text, charset)
    }
}

fn from_json(value: serde_json::Value) -> Result<Value, CodecError> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| CodecError::malformed(FORMAT, format!("number out of range: {}", n)))?,
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(from_json).collect::<Result<_, _>>()?)
        }
        serde_json::Value::Object(object) => {
            let mut type_name = None;
            let mut fields = BTreeMap::new();
            for (key, value) in object {
                if key == TYPE_KEY {
                    match value {
                        serde_json::Value::String(s) => type_name = Some(s),
                        _ => return Err(CodecError::malformed(FORMAT, "!type must be a string")),
                    }
                } else {
                    fields.insert(key, from_json(value)?);
                }
            }
            match type_name {
                Some(type_name) => Value::Resource(Resource::from_fields(type_name, fields)),
                None => Value::Map(fields),
            }
        }
    })
}

fn to_json(value: &Value) -> Result<serde_json::Value, CodecError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| CodecError::format(FORMAT, format!("{} is not a JSON number", f)))?,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        Value::Map(fields) => serde_json::Value::Object(to_object(None, fields.iter())?),
        Value::Resource(resource) => {
            serde_json::Value::Object(to_object(Some(resource.type_name()), resource.fields())?)
        }
    })
}

fn to_object<'a>(
    type_name: Option<&str>,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<Map<String, serde_json::Value>, CodecError> {
    let mut object = Map::new();
    if let Some(type_name) = type_name {
        object.insert(TYPE_KEY.to_string(), serde_json::Value::String(type_name.to_string()));
    }
    for (key, value) in fields {
        object.insert(key.clone(), to_json(value)?);
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::hints::Hints;

    fn cx(hints: &Hints) -> CodecContext<'_> {
        CodecContext {
            hints,
            collection: "books",
        }
    }

    #[test]
    fn test_parse_untyped_and_typed_objects() {
        let hints = Hints::default();
        let value = JsonCodec
            .parse(
                br#"{"title": "Book Title", "year": "2010", "reviews": [{"!type": "review", "comment": "Great"}]}"#,
                None,
                &cx(&hints),
            )
            .unwrap();
        let Value::Map(fields) = value else {
            panic!("expected an untyped mapping");
        };
        assert_eq!(fields["title"], Value::from("Book Title"));
        let Value::List(reviews) = &fields["reviews"] else {
            panic!("expected a list");
        };
        let review = reviews[0].as_resource().unwrap();
        assert_eq!(review.type_name(), "review");
        assert_eq!(review.get("comment"), Some(&Value::from("Great")));
    }

    #[test]
    fn test_format_keeps_type_key() {
        let hints = Hints::default();
        let book = Value::Resource(Resource::new("book").with("year", 2010i64));
        let bytes = JsonCodec.format(&book, UTF_8, &cx(&hints)).unwrap();
        assert_eq!(bytes, br#"{"!type":"book","year":2010}"#);
    }

    #[test]
    fn test_malformed_body() {
        let hints = Hints::default();
        let err = JsonCodec.parse(b"{\"title\": ", None, &cx(&hints)).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { format: "JSON", .. }));
        let err = JsonCodec.parse(br#"{"!type": 3}"#, None, &cx(&hints)).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }
}
