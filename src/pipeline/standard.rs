//! Filters and exception handlers giving the default routes their CRUD
//! behaviour.
//!
//! # Chains
//! ```text
//! list    in:  HandleMethodNotAllowed, EnsureNoEntity
//!         out: ReverseTransformResource, FormatEntity
//! show    in:  HandleMethodNotAllowed, EnsureNoEntity
//!         out: NotFoundIfEmpty, ReverseTransformResource, FormatEntity
//! create  in:  HandleMethodNotAllowed, ParseEntity, TransformResource
//!         out: HandleCreateOutput, ReverseTransformResource, FormatEntity
//! update  in:  HandleMethodNotAllowed, ParseEntity, TransformResource
//!         out: HandleUpdateOutput, ReverseTransformResource, FormatEntity
//! delete  in:  HandleMethodNotAllowed, EnsureNoEntity
//!         out: HandleDeleteOutput
//! all     exceptions: HandleNotFound, HandleInvalidInput
//! ```

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::collection::actions;
use crate::error::{ActionError, CodecError, Fault, HttpReturn, TransformError};
use crate::negotiation::parse_content_type;
use crate::pipeline::context::RequestContext;
use crate::pipeline::filter::{priority, ExceptionHandler, InputFilter, OutputFilter};
use crate::pipeline::registry::{FilterRegistry, Scope};
use crate::resource::{Entity, Resource, Value};

/// Id of the error resource returned for invalid input.
pub const ENTITY_ERROR_ID: &str = "rest.entity_error";

/// Answers 405 when the route says so or the collection lacks the action.
#[derive(Debug)]
pub struct HandleMethodNotAllowed;

impl InputFilter for HandleMethodNotAllowed {
    fn filter(&self, cx: &mut RequestContext<'_>, input: Entity) -> Result<Entity, Fault> {
        let action = cx.action();
        let handler = cx.collection.handler();
        if action != actions::METHOD_NOT_ALLOWED && handler.supports(action) {
            return Ok(input);
        }

        let allowed: Vec<String> = cx
            .app
            .mapper()
            .methods_for(&cx.request.path)
            .into_iter()
            .filter(|(_, action)| handler.supports(action))
            .map(|(method, _)| method.to_string())
            .collect();
        let mut ret = HttpReturn::new(StatusCode::METHOD_NOT_ALLOWED);
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            ret = ret.with_header(header::ALLOW, value);
        }
        Err(ret.into())
    }
}

/// Rejects a request body on actions that take none.
#[derive(Debug)]
pub struct EnsureNoEntity;

impl InputFilter for EnsureNoEntity {
    fn filter(&self, _cx: &mut RequestContext<'_>, input: Entity) -> Result<Entity, Fault> {
        if !input.is_empty() {
            return Err(Fault::status_with(
                StatusCode::BAD_REQUEST,
                "Action does not accept any input.",
            ));
        }
        Ok(input)
    }
}

/// Decodes the raw body with the codec named by `Content-Type`.
#[derive(Debug)]
pub struct ParseEntity;

impl InputFilter for ParseEntity {
    fn filter(&self, cx: &mut RequestContext<'_>, input: Entity) -> Result<Entity, Fault> {
        let body = match input {
            Entity::Empty => None,
            Entity::Bytes(body) => Some(body),
            parsed => return Ok(parsed),
        };

        let Some(content_type) = cx.request.header(header::CONTENT_TYPE.as_str()) else {
            return Err(Fault::status_with(
                StatusCode::BAD_REQUEST,
                "Missing Content-Type header.",
            ));
        };
        let media_type = parse_content_type(content_type)?;
        let Some(body) = body.filter(|body| !body.is_empty()) else {
            return Err(Fault::status_with(
                StatusCode::BAD_REQUEST,
                "Action requires input.",
            ));
        };

        let essence = media_type.essence();
        let codec = cx
            .app
            .codecs()
            .for_input(&essence)
            .ok_or(CodecError::UnsupportedMediaType(essence))?;
        let value = codec.parse(&body, media_type.charset(), &cx.codec_context())?;
        Ok(Entity::Value(value))
    }
}

/// External representation to internal, per the collection rules.
#[derive(Debug)]
pub struct TransformResource;

impl InputFilter for TransformResource {
    fn filter(&self, cx: &mut RequestContext<'_>, input: Entity) -> Result<Entity, Fault> {
        let Entity::Value(value) = input else {
            return Ok(input);
        };
        match cx.transformer().forward(value) {
            Ok(value) => Ok(Entity::Value(value)),
            Err(TransformError::Validation(err)) => Err(invalid_input(cx, &err.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

/// 201 plus `Location` for a created entity.
#[derive(Debug)]
pub struct HandleCreateOutput;

impl OutputFilter for HandleCreateOutput {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        if cx.response.status == StatusCode::OK {
            cx.response.status = StatusCode::CREATED;
        }
        let (location, body) = match output {
            Entity::Located { location, entity } => (Some(location), *entity),
            Entity::Value(Value::String(location)) => (Some(location), Entity::Empty),
            other => (None, other),
        };

        if let Some(location) = location {
            let url = cx.request.absolute_url(&location, cx.app.public_url());
            let value = HeaderValue::from_str(&url)
                .map_err(|_| Fault::Internal(format!("invalid location: {}", url)))?;
            cx.response.headers.insert(header::LOCATION, value.clone());
            if !body.is_empty() {
                cx.response.headers.insert(header::CONTENT_LOCATION, value);
            }
        }
        Ok(body)
    }
}

/// 204 for an update that returns nothing.
#[derive(Debug)]
pub struct HandleUpdateOutput;

impl OutputFilter for HandleUpdateOutput {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        if output.is_empty() {
            cx.response.status = StatusCode::NO_CONTENT;
            return Ok(Entity::Empty);
        }
        Ok(output)
    }
}

#[derive(Debug)]
pub struct HandleDeleteOutput;

impl OutputFilter for HandleDeleteOutput {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        if !output.is_empty() {
            return Err(Fault::status_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Not expecting any output for this action",
            ));
        }
        cx.response.status = StatusCode::NO_CONTENT;
        Ok(Entity::Empty)
    }
}

#[derive(Debug)]
pub struct NotFoundIfEmpty;

impl OutputFilter for NotFoundIfEmpty {
    fn filter(&self, _cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        if output.is_empty() {
            return Err(HttpReturn::new(StatusCode::NOT_FOUND).into());
        }
        Ok(output)
    }
}

/// Internal representation back to external.
#[derive(Debug)]
pub struct ReverseTransformResource;

impl OutputFilter for ReverseTransformResource {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        match output {
            Entity::Value(value) => Ok(Entity::Value(cx.transformer().reverse(value)?)),
            other => Ok(other),
        }
    }
}

/// Encodes the body in the negotiated media type and charset.
#[derive(Debug)]
pub struct FormatEntity;

impl OutputFilter for FormatEntity {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        let Entity::Value(value) = output else {
            return Ok(output);
        };
        if value == Value::Null {
            return Ok(Entity::Empty);
        }
        let representation = cx.negotiate()?;
        let body = representation
            .codec
            .format(&value, representation.charset, &cx.codec_context())?;
        let content_type = HeaderValue::from_str(&representation.content_type())
            .map_err(|err| Fault::Internal(err.to_string()))?;
        cx.response.headers.insert(header::CONTENT_TYPE, content_type);
        Ok(Entity::Bytes(body.into()))
    }
}

/// "Not found" from an action becomes a plain 404.
#[derive(Debug)]
pub struct HandleNotFound;

impl ExceptionHandler for HandleNotFound {
    fn handle(&self, _cx: &mut RequestContext<'_>, fault: Fault) -> Option<Fault> {
        match fault {
            Fault::Action(ActionError::NotFound(what)) => Some(
                HttpReturn::new(StatusCode::NOT_FOUND)
                    .with_reason(format!("Not found: {}", what))
                    .into(),
            ),
            other => Some(other),
        }
    }
}

/// Invalid input from an action becomes a 400 carrying an `error`
/// resource.
#[derive(Debug)]
pub struct HandleInvalidInput;

impl ExceptionHandler for HandleInvalidInput {
    fn handle(&self, cx: &mut RequestContext<'_>, fault: Fault) -> Option<Fault> {
        match fault {
            Fault::Action(ActionError::Invalid(message)) => Some(invalid_input(cx, &message)),
            Fault::Validation(err) | Fault::Transform(TransformError::Validation(err)) => {
                Some(invalid_input(cx, &err.to_string()))
            }
            other => Some(other),
        }
    }
}

/// A 400 whose body is an `error` resource in the negotiated
/// representation. Falls back to plain text when nothing is acceptable.
fn invalid_input(cx: &RequestContext<'_>, message: &str) -> Fault {
    let error = Value::Resource(
        Resource::new("error")
            .with("id", ENTITY_ERROR_ID)
            .with("message", message),
    );
    let formatted = cx.negotiate().ok().and_then(|representation| {
        let body = representation
            .codec
            .format(&error, representation.charset, &cx.codec_context())
            .ok()?;
        let content_type = HeaderValue::from_str(&representation.content_type()).ok()?;
        Some((content_type, body))
    });

    match formatted {
        Some((content_type, body)) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, content_type);
            HttpReturn::new(StatusCode::BAD_REQUEST)
                .with_reason(message)
                .with_body(headers, body)
                .into()
        }
        None => Fault::status_with(StatusCode::BAD_REQUEST, message),
    }
}

/// Register the standard chains.
pub fn install(filters: &mut FilterRegistry) {
    use crate::collection::actions::{CREATE, DELETE, LIST, SHOW, UPDATE};

    filters.add_input_filter(
        Scope::Any,
        Scope::Any,
        priority::HIGHEST,
        Arc::new(HandleMethodNotAllowed),
    );
    for action in [LIST, SHOW, DELETE] {
        filters.add_input_filter(Scope::Any, action, priority::HIGHER, Arc::new(EnsureNoEntity));
    }
    for action in [CREATE, UPDATE] {
        filters.add_input_filter(Scope::Any, action, priority::NORMAL, Arc::new(ParseEntity));
        filters.add_input_filter(Scope::Any, action, priority::LOWER, Arc::new(TransformResource));
    }

    filters.add_output_filter(Scope::Any, CREATE, priority::HIGHER, Arc::new(HandleCreateOutput));
    filters.add_output_filter(Scope::Any, UPDATE, priority::HIGHER, Arc::new(HandleUpdateOutput));
    filters.add_output_filter(Scope::Any, DELETE, priority::HIGHER, Arc::new(HandleDeleteOutput));
    filters.add_output_filter(Scope::Any, SHOW, priority::HIGHER, Arc::new(NotFoundIfEmpty));
    for action in [LIST, SHOW, CREATE, UPDATE] {
        filters.add_output_filter(
            Scope::Any,
            action,
            priority::NORMAL,
            Arc::new(ReverseTransformResource),
        );
        filters.add_output_filter(Scope::Any, action, priority::LOWER, Arc::new(FormatEntity));
    }

    filters.add_exception_handler(Scope::Any, Scope::Any, priority::NORMAL, Arc::new(HandleNotFound));
    filters.add_exception_handler(
        Scope::Any,
        Scope::Any,
        priority::NORMAL,
        Arc::new(HandleInvalidInput),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_registers_crud_chains() {
        let mut filters = FilterRegistry::new();
        install(&mut filters);

        assert_eq!(filters.input_filters("books", actions::CREATE).len(), 3);
        assert_eq!(filters.input_filters("books", actions::LIST).len(), 2);
        assert_eq!(filters.output_filters("books", actions::SHOW).len(), 3);
        assert_eq!(filters.output_filters("books", actions::DELETE).len(), 1);
        assert_eq!(filters.exception_handlers("books", "anything").len(), 2);
        assert_eq!(
            format!("{:?}", filters.input_filters("books", actions::UPDATE)),
            "[HandleMethodNotAllowed, ParseEntity, TransformResource]"
        );
        assert_eq!(
            format!("{:?}", filters.output_filters("books", actions::CREATE)),
            "[HandleCreateOutput, ReverseTransformResource, FormatEntity]"
        );
    }
}
