//! YAML codec. Resources are written as tagged mappings (`!book`), and an
//! unrecognized tag on input names the type of the mapping it decorates.

use std::collections::BTreeMap;

use serde_yaml::value::{Mapping, Tag, TaggedValue};

use crate::entity::charset::{self, UTF_8};
use crate::entity::codec::{Codec, CodecContext};
use crate::error::CodecError;
use crate::resource::{Resource, Value, TYPE_KEY};

const FORMAT: &str = "YAML";

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn media_type(&self) -> &'static str {
        "text/x-yaml"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["text/yaml", "application/x-yaml", "application/yaml"]
    }

    fn parse(
        &self,
        body: &[u8],
        charset: Option<&str>,
        _cx: &CodecContext<'_>,
    ) -> Result<Value, CodecError> {
        let text = charset::decode(body, charset.unwrap_or(UTF_8))?;
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| CodecError::malformed(FORMAT, e))?;
        from_yaml(parsed)
    }

    fn format(
        &self,
        value: &Value,
        charset: &str,
        _cx: &CodecContext<'_>,
    ) -> Result<Vec<u8>, CodecError> {
        let text =
            serde_yaml::to_string(&to_yaml(value)).map_err(|e| CodecError::format(FORMAT, e))?;
        charset::encode(&text, charset)
    }
}

fn from_yaml(value: serde_yaml::Value) -> Result<Value, CodecError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Int(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => {
                return Err(CodecError::malformed(FORMAT, format!("number out of range: {}", n)))
            }
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::List(items.into_iter().map(from_yaml).collect::<Result<_, _>>()?)
        }
        serde_yaml::Value::Mapping(mapping) => {
            let (type_name, fields) = from_mapping(mapping)?;
            match type_name {
                Some(type_name) => Value::Resource(Resource::from_fields(type_name, fields)),
                None => Value::Map(fields),
            }
        }
        serde_yaml::Value::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            let type_name = tag.to_string().trim_start_matches('!').to_string();
            let fields = match value {
                serde_yaml::Value::Mapping(mapping) => from_mapping(mapping)?.1,
                serde_yaml::Value::Null => BTreeMap::new(),
                other => {
                    return Err(CodecError::malformed(
                        FORMAT,
                        format!("tag !{} must decorate a mapping, not {:?}", type_name, other),
                    ))
                }
            };
            Value::Resource(Resource::from_fields(type_name, fields))
        }
    })
}

type Fields = BTreeMap<String, Value>;

fn from_mapping(mapping: Mapping) -> Result<(Option<String>, Fields), CodecError> {
    let mut type_name = None;
    let mut fields = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(CodecError::malformed(
                    FORMAT,
                    format!("mapping keys must be scalars, found {:?}", other),
                ))
            }
        };
        if key == TYPE_KEY {
            match value {
                serde_yaml::Value::String(s) => type_name = Some(s),
                _ => return Err(CodecError::malformed(FORMAT, "!type must be a string")),
            }
        } else {
            fields.insert(key, from_yaml(value)?);
        }
    }
    Ok((type_name, fields))
}

fn to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Int(i) => serde_yaml::Value::Number((*i).into()),
        Value::Float(f) => serde_yaml::Value::Number((*f).into()),
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::List(items) => serde_yaml::Value::Sequence(items.iter().map(to_yaml).collect()),
        Value::Map(fields) => serde_yaml::Value::Mapping(to_mapping(fields.iter())),
        Value::Resource(resource) => serde_yaml::Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(resource.type_name()),
            value: serde_yaml::Value::Mapping(to_mapping(resource.fields())),
        })),
    }
}

fn to_mapping<'a>(fields: impl Iterator<Item = (&'a String, &'a Value)>) -> Mapping {
    fields
        .map(|(key, value)| (serde_yaml::Value::String(key.clone()), to_yaml(value)))
        .collect()
}
