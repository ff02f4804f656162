//! XML codec.
//!
//! XML cannot tell a record from a list, nor a single child from a list of
//! one. Parsing resolves this per node:
//! - an element without child elements is a scalar (its text, or null)
//! - an element whose children repeat a tag, or whose path has a
//!   `sequence` hint, is a list of its children
//! - any other element is a resource typed by the `type` hint at its path,
//!   or by its own tag
//!
//! Node paths are `/` + root tag + the chain of child tags. When the root
//! element is a list, each of its children is addressed as a root itself.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::entity::charset::{self, UTF_8};
use crate::entity::codec::{Codec, CodecContext};
use crate::entity::hints::Hints;
use crate::error::CodecError;
use crate::resource::{Resource, Value};

const FORMAT: &str = "XML";

/// Element name used for list items that carry no name of their own.
const ITEM_ELEMENT: &str = "item";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn media_type(&self) -> &'static str {
        "text/xml"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["application/xml"]
    }

    fn parse(
        &self,
        body: &[u8],
        charset: Option<&str>,
        cx: &CodecContext<'_>,
    ) -> Result<Value, CodecError> {
        // The HTTP header charset wins over the prolog.
        let declared = prolog_encoding(body);
        let charset = charset.or(declared.as_deref()).unwrap_or(UTF_8);
        let text = charset::decode(body, charset)?;
        let root = read_tree(&text)?;
        let path = format!("/{}", root.name);
        Ok(convert(root, &path, true, cx.hints))
    }

    fn format(
        &self,
        value: &Value,
        charset: &str,
        cx: &CodecContext<'_>,
    ) -> Result<Vec<u8>, CodecError> {
        let root = match value {
            Value::Resource(resource) => element_for(value, resource.type_name())?,
            Value::List(_) => element_for(value, cx.collection)?,
            other => {
                return Err(CodecError::format(
                    FORMAT,
                    format!("cannot format a {} as an XML document", other.kind()),
                ))
            }
        };
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some(charset), None)))?;
        root.write(&mut writer)?;
        let mut out = String::from_utf8(writer.into_inner())
            .map_err(|e| CodecError::format(FORMAT, e))?;
        out.push('\n');
        charset::encode(&out, charset)
    }
}

/// A parsed element: tag, concatenated text, child elements.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), CodecError> {
        let start = BytesStart::new(self.name.as_str());
        if self.children.is_empty() && self.text.is_empty() {
            return emit(writer, Event::Empty(start));
        }
        emit(writer, Event::Start(start))?;
        if self.children.is_empty() {
            emit(writer, Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        emit(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CodecError> {
    writer
        .write_event(event)
        .map_err(|e| CodecError::format(FORMAT, e))
}

fn read_tree(text: &str) -> Result<Element, CodecError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            CodecError::malformed(FORMAT, format!("{} at byte {}", e, reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(Element::named(tag_name(start.name().as_ref())?)),
            Event::Empty(start) => {
                let element = Element::named(tag_name(start.name().as_ref())?);
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CodecError::malformed(FORMAT, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|e| CodecError::malformed(FORMAT, e))?;
                append_text(&mut stack, &content)?;
            }
            Event::CData(content) => {
                let content = content.into_inner();
                let content = std::str::from_utf8(&content)
                    .map_err(|e| CodecError::malformed(FORMAT, e))?;
                append_text(&mut stack, content)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodecError::malformed(
            FORMAT,
            format!("unexpected end of document inside <{}>", open.name),
        ));
    }
    root.ok_or_else(|| CodecError::malformed(FORMAT, "no root element"))
}

fn tag_name(raw: &[u8]) -> Result<String, CodecError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| CodecError::malformed(FORMAT, e))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(CodecError::malformed(FORMAT, "more than one root element"))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn append_text(stack: &mut [Element], content: &str) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(element) => element.text.push_str(content),
        None if content.trim().is_empty() => {}
        None => return Err(CodecError::malformed(FORMAT, "text outside the root element")),
    }
    Ok(())
}

fn convert(element: Element, path: &str, is_root: bool, hints: &Hints) -> Value {
    if element.children.is_empty() {
        let text = element.text.trim();
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text.to_string())
        };
    }

    let hint = hints.get(path);
    let mut seen = std::collections::HashSet::new();
    let has_duplicates = !element.children.iter().all(|child| seen.insert(child.name.as_str()));

    if has_duplicates || hint.is_some_and(|hint| hint.sequence) {
        let items = element
            .children
            .into_iter()
            .map(|child| {
                let child_path = if is_root {
                    format!("/{}", child.name)
                } else {
                    format!("{}/{}", path, child.name)
                };
                convert(child, &child_path, false, hints)
            })
            .collect();
        return Value::List(items);
    }

    let type_name = hint
        .and_then(|hint| hint.type_name.clone())
        .unwrap_or_else(|| element.name.clone());
    let mut resource = Resource::new(type_name);
    for child in element.children {
        let child_path = format!("{}/{}", path, child.name);
        let name = child.name.clone();
        resource.insert(name, convert(child, &child_path, false, hints));
    }
    Value::Resource(resource)
}

/// Build the element for `value` under the name its parent gives it.
fn element_for(value: &Value, name: &str) -> Result<Element, CodecError> {
    let mut element = Element::named(name);
    match value {
        Value::Null => {}
        Value::Resource(resource) => {
            for (key, child) in resource.fields() {
                element.children.push(element_for(child, key)?);
            }
        }
        Value::Map(fields) => {
            for (key, child) in fields {
                element.children.push(element_for(child, key)?);
            }
        }
        Value::List(items) => {
            for item in items {
                let item_name = match item {
                    Value::Resource(resource) => resource.type_name(),
                    Value::Map(_) => {
                        return Err(CodecError::format(
                            FORMAT,
                            format!("untyped mapping inside <{}>", name),
                        ))
                    }
                    _ => ITEM_ELEMENT,
                };
                element.children.push(element_for(item, item_name)?);
            }
        }
        scalar => element.text = scalar.scalar_text().unwrap_or_default(),
    }
    Ok(element)
}

/// The `encoding` pseudo-attribute of an XML declaration, if any.
fn prolog_encoding(body: &[u8]) -> Option<String> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let start = body.iter().position(|b| !b.is_ascii_whitespace())?;
    let body = &body[start..];
    if !body.starts_with(b"<?xml") {
        return None;
    }
    let end = body.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&body[..end]).ok()?;
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    rest.find(quote).map(|close| rest[..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str, hints: &str) -> Value {
        let hints = Hints::parse(hints).unwrap();
        let cx = CodecContext {
            hints: &hints,
            collection: "books",
        };
        XmlCodec.parse(body.as_bytes(), None, &cx).unwrap()
    }

    fn format(value: &Value) -> String {
        let hints = Hints::default();
        let cx = CodecContext {
            hints: &hints,
            collection: "books",
        };
        String::from_utf8(XmlCodec.format(value, UTF_8, &cx).unwrap()).unwrap()
    }

    const REVIEWED: &str = "<book><review><comment>Great</comment></review></book>";

    #[test]
    fn test_hint_type_gives_nested_record() {
        let value = parse(REVIEWED, "book/review: type=review");
        let book = value.as_resource().unwrap();
        assert_eq!(book.type_name(), "book");
        let review = book.get("review").and_then(Value::as_resource).unwrap();
        assert_eq!(review.type_name(), "review");
        assert_eq!(review.get("comment"), Some(&Value::from("Great")));
    }

    #[test]
    fn test_sequence_hint_gives_list() {
        let value = parse(REVIEWED, "book/review: type=review, sequence");
        let book = value.as_resource().unwrap();
        let Some(Value::List(items)) = book.get("review") else {
            panic!("expected a one-element list, got {:?}", book.get("review"));
        };
        assert_eq!(items.len(), 1);
        // The child <comment> is the only element of the list.
        assert_eq!(items[0], Value::from("Great"));
    }

    #[test]
    fn test_duplicate_tags_give_list() {
        let value = parse(
            "<book><reviews><review><comment>a</comment></review><review><comment>b</comment></review></reviews></book>",
            "",
        );
        let book = value.as_resource().unwrap();
        let Some(Value::List(items)) = book.get("reviews") else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_resource().unwrap().type_name(), "review");
    }

    #[test]
    fn test_leaves_are_scalars() {
        let value = parse("<?xml version=\"1.0\" ?>\n<book>\n  <title>Dune &amp; more</title>\n  <year/>\n</book>", "");
        let book = value.as_resource().unwrap();
        assert_eq!(book.get("title"), Some(&Value::from("Dune & more")));
        assert_eq!(book.get("year"), Some(&Value::Null));
    }

    #[test]
    fn test_root_list_elements_are_roots() {
        let value = parse(
            "<books><book><title>a</title></book><book><title>b</title></book></books>",
            "/book: type=novel",
        );
        let Value::List(items) = value else {
            panic!("expected a list");
        };
        assert_eq!(items[0].as_resource().unwrap().type_name(), "novel");
    }

    #[test]
    fn test_format_layout() {
        let book = Value::Resource(
            Resource::new("book")
                .with("title", "Dune")
                .with("reviews", vec![Value::Resource(Resource::new("review").with("comment", "ok"))]),
        );
        assert_eq!(
            format(&book),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <book>\n\
             \x20 <reviews>\n\
             \x20   <review>\n\
             \x20     <comment>ok</comment>\n\
             \x20   </review>\n\
             \x20 </reviews>\n\
             \x20 <title>Dune</title>\n\
             </book>\n"
        );
    }

    #[test]
    fn test_format_root_list_uses_collection_name() {
        let list = Value::List(vec![Value::Resource(Resource::new("book").with("title", "a"))]);
        let text = format(&list);
        assert!(text.contains("<books>\n  <book>\n    <title>a</title>"), "{}", text);
    }

    #[test]
    fn test_format_escapes_text_and_collapses_empty_elements() {
        let book = Value::Resource(
            Resource::new("book")
                .with("title", "Dune & <more>")
                .with("year", Value::Null),
        );
        let text = format(&book);
        assert!(text.contains("  <title>Dune &amp; &lt;more&gt;</title>"), "{}", text);
        assert!(text.contains("  <year/>"), "{}", text);

        let back = parse(&text, "");
        let back = back.as_resource().unwrap();
        assert_eq!(back.get("title"), Some(&Value::from("Dune & <more>")));
        assert_eq!(back.get("year"), Some(&Value::Null));
    }

    #[test]
    fn test_prolog_encoding() {
        assert_eq!(
            prolog_encoding(b"<?xml version='1.0' encoding='ISO-8859-1'?><a/>").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(prolog_encoding(b"<a/>"), None);

        let hints = Hints::default();
        let cx = CodecContext {
            hints: &hints,
            collection: "books",
        };
        let body = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\" ?><book><title>caf\xe9</title></book>";
        let value = XmlCodec.parse(body, None, &cx).unwrap();
        assert_eq!(value.as_resource().unwrap().get("title"), Some(&Value::from("café")));
    }

    #[test]
    fn test_malformed_body() {
        let hints = Hints::default();
        let cx = CodecContext {
            hints: &hints,
            collection: "books",
        };
        for body in ["<book><title>x</book>", "<book>", "", "<a/><b/>"] {
            let err = XmlCodec.parse(body.as_bytes(), None, &cx).unwrap_err();
            assert!(matches!(err, CodecError::Malformed { format: "XML", .. }), "{}", body);
        }
    }
}
