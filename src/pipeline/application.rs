//! The application object and the request state machine.
//!
//! # Responsibilities
//! - Own the route table, collections, filters, codecs and charsets
//! - Drive one request through routing, input filters, the action,
//!   exception handlers and output filters
//! - Turn every fault into a response; nothing escapes `handle`
//!
//! # Design Decisions
//! - Everything is immutable after `build()`; per-request state lives in
//!   `RequestContext`
//! - Input and output filter faults answer the request directly; only
//!   faults raised by the action visit the exception handlers

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, StatusCode};

use crate::collection::{
    ActionCall, Collection, CollectionRegistry, CollectionSpec, RegistryError,
};
use crate::entity::CodecRegistry;
use crate::entity::charset;
use crate::error::{ActionError, Fault, HttpReturn};
use crate::http::{Request, Response};
use crate::observability::logging::error_chain;
use crate::observability::metrics;
use crate::pipeline::context::{Phase, RequestContext};
use crate::pipeline::filter::{ExceptionHandler, InputFilter, OutputFilter};
use crate::pipeline::registry::{FilterRegistry, Scope};
use crate::pipeline::standard;
use crate::resource::{Entity, Value};
use crate::routing::{Mapper, PatternError};

/// Errors raised while assembling an application.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Route(#[from] PatternError),

    #[error("at least one output charset is required")]
    NoCharsets,

    #[error("unsupported output charset: {0}")]
    UnknownCharset(String),
}

/// A configured REST application.
#[derive(Debug)]
pub struct Application {
    mapper: Mapper,
    collections: CollectionRegistry,
    filters: FilterRegistry,
    codecs: CodecRegistry,
    charsets: Vec<String>,
    public_url: Option<String>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn collections(&self) -> &CollectionRegistry {
        &self.collections
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Output charsets in preference order.
    pub fn charsets(&self) -> &[String] {
        &self.charsets
    }

    /// Base URL used to make `Location` headers absolute.
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    /// Process one request to completion.
    pub fn handle(&self, request: &Request) -> Response {
        let started = Instant::now();

        let Some(route) = self.mapper.match_path(&request.path, &request.method) else {
            tracing::debug!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                "No matching route"
            );
            let response = Response::text(StatusCode::NOT_FOUND, "No matching route found");
            metrics::record_request("-", "-", response.status.as_u16(), started);
            return response;
        };

        let Some(collection) = self.collections.get(&route.collection) else {
            tracing::debug!(
                request_id = %request.request_id,
                collection = %route.collection,
                "Unknown collection"
            );
            let response = Response::text(
                StatusCode::NOT_FOUND,
                format!("No such collection: {}", route.collection),
            );
            metrics::record_request("-", &route.action, response.status.as_u16(), started);
            return response;
        };

        let mut cx = RequestContext::new(self, request, &route, collection);
        let response = self.run(&mut cx);
        cx.phase = Phase::Done;

        tracing::debug!(
            request_id = %request.request_id,
            collection = %collection.name(),
            action = %route.action,
            status = response.status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request finished"
        );
        metrics::record_request(
            collection.name(),
            &route.action,
            response.status.as_u16(),
            started,
        );
        response
    }

    fn run(&self, cx: &mut RequestContext<'_>) -> Response {
        let entry = cx.collection;
        let collection = entry.name();
        let action = cx.action();

        let mut input = if cx.request.body.is_empty() {
            Entity::Empty
        } else {
            Entity::Bytes(cx.request.body.clone())
        };
        for filter in self.filters.input_filters(collection, action) {
            input = match filter.filter(cx, input) {
                Ok(input) => input,
                Err(fault) => return fault_response(cx, fault),
            };
        }

        let input = match input {
            Entity::Empty | Entity::Value(Value::Null) => None,
            Entity::Value(value) => Some(value),
            Entity::Bytes(ref bytes) if bytes.is_empty() => None,
            Entity::Bytes(_) | Entity::Located { .. } => {
                let fault = Fault::Internal("unparsed request entity".into());
                return fault_response(cx, fault);
            }
        };
        let mut args = cx.request.query_params();
        args.extend(
            cx.route
                .path_vars
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        cx.phase = Phase::ActionInvoked;
        tracing::debug!(
            request_id = %cx.request.request_id,
            collection = %collection,
            action = %action,
            "Invoking action"
        );
        let output = match entry.handler().call(action, ActionCall { args, input }) {
            Ok(output) => output,
            Err(error) => {
                cx.phase = Phase::ExceptionHandling;
                return match self.handle_exception(cx, error.into()) {
                    None => Response::new(cx.response.clone(), Bytes::new()),
                    Some(fault) => fault_response(cx, fault),
                };
            }
        };

        cx.phase = Phase::OutputFiltering;
        let mut output = output;
        for filter in self.filters.output_filters(collection, action) {
            output = match filter.filter(cx, output) {
                Ok(output) => output,
                Err(fault) => return fault_response(cx, fault),
            };
        }

        match output {
            Entity::Empty => Response::new(cx.response.clone(), Bytes::new()),
            Entity::Bytes(body) => Response::new(cx.response.clone(), body),
            Entity::Value(Value::Null) => Response::new(cx.response.clone(), Bytes::new()),
            Entity::Value(_) | Entity::Located { .. } => {
                fault_response(cx, Fault::Internal("unformatted response entity".into()))
            }
        }
    }

    /// Pass a fault through the exception handlers. `None` means one of
    /// them dealt with it.
    fn handle_exception(&self, cx: &mut RequestContext<'_>, fault: Fault) -> Option<Fault> {
        let mut fault = fault;
        for handler in self
            .filters
            .exception_handlers(cx.collection.name(), cx.action())
        {
            fault = handler.handle(cx, fault)?;
        }
        Some(fault)
    }
}

/// Render a fault that nobody handled.
fn fault_response(cx: &RequestContext<'_>, fault: Fault) -> Response {
    let status = fault.status();
    if status.is_server_error() {
        tracing::error!(
            request_id = %cx.request.request_id,
            collection = %cx.collection.name(),
            action = %cx.action(),
            phase = ?cx.phase,
            error = %error_chain(&fault),
            "Request failed"
        );
    } else {
        tracing::warn!(
            request_id = %cx.request.request_id,
            collection = %cx.collection.name(),
            action = %cx.action(),
            phase = ?cx.phase,
            status = status.as_u16(),
            error = %fault,
            "Request rejected"
        );
    }

    match fault {
        Fault::Return(ret) | Fault::Action(ActionError::Status(ret)) => return_response(ret),
        other => Response::text(status, other.to_string()),
    }
}

fn return_response(ret: HttpReturn) -> Response {
    if !ret.body.is_empty() {
        return Response {
            status: ret.status,
            headers: ret.headers,
            body: ret.body,
        };
    }
    let text = ret
        .reason
        .or_else(|| ret.status.canonical_reason().map(str::to_string))
        .unwrap_or_default();
    let mut response = Response::text(ret.status, text);
    for (name, value) in ret.headers.iter() {
        if name != header::CONTENT_TYPE {
            response.headers.insert(name.clone(), value.clone());
        }
    }
    response
}

type Registration<T> = (Scope, Scope, i32, Arc<T>);

/// Assembles an [`Application`].
#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    mapper: Option<Mapper>,
    collections: Vec<(CollectionSpec, Arc<dyn Collection>)>,
    codecs: Option<CodecRegistry>,
    charsets: Option<Vec<String>>,
    public_url: Option<String>,
    skip_standard_filters: bool,
    input: Vec<Registration<dyn InputFilter>>,
    output: Vec<Registration<dyn OutputFilter>>,
    exception: Vec<Registration<dyn ExceptionHandler>>,
}

impl ApplicationBuilder {
    /// Replace the default CRUD routes.
    pub fn mapper(mut self, mapper: Mapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn collection(mut self, spec: CollectionSpec, handler: Arc<dyn Collection>) -> Self {
        self.collections.push((spec, handler));
        self
    }

    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    /// Output charsets in preference order; defaults to utf-8 only.
    pub fn charsets<I, S>(mut self, charsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.charsets = Some(charsets.into_iter().map(Into::into).collect());
        self
    }

    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Whether to install the standard CRUD filters (default: yes).
    pub fn standard_filters(mut self, enabled: bool) -> Self {
        self.skip_standard_filters = !enabled;
        self
    }

    pub fn input_filter(
        mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        filter: Arc<dyn InputFilter>,
    ) -> Self {
        self.input
            .push((collection.into(), action.into(), priority, filter));
        self
    }

    pub fn output_filter(
        mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        filter: Arc<dyn OutputFilter>,
    ) -> Self {
        self.output
            .push((collection.into(), action.into(), priority, filter));
        self
    }

    pub fn exception_handler(
        mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        self.exception
            .push((collection.into(), action.into(), priority, handler));
        self
    }

    pub fn build(self) -> Result<Application, BuildError> {
        let mapper = match self.mapper {
            Some(mapper) => mapper,
            None => Mapper::with_default_routes()?,
        };

        let mut collections = CollectionRegistry::new();
        for (spec, handler) in self.collections {
            collections.register(spec, handler)?;
        }

        let charsets: Vec<String> = match self.charsets {
            Some(charsets) => charsets
                .iter()
                .map(|name| {
                    charset::canonical(name)
                        .map(str::to_string)
                        .ok_or_else(|| BuildError::UnknownCharset(name.clone()))
                })
                .collect::<Result<_, _>>()?,
            None => vec![charset::UTF_8.to_string()],
        };
        if charsets.is_empty() {
            return Err(BuildError::NoCharsets);
        }

        let mut filters = FilterRegistry::new();
        if !self.skip_standard_filters {
            standard::install(&mut filters);
        }
        for (collection, action, priority, filter) in self.input {
            filters.add_input_filter(collection, action, priority, filter);
        }
        for (collection, action, priority, filter) in self.output {
            filters.add_output_filter(collection, action, priority, filter);
        }
        for (collection, action, priority, handler) in self.exception {
            filters.add_exception_handler(collection, action, priority, handler);
        }

        tracing::info!(
            collections = collections.len(),
            routes = mapper.routes().len(),
            filters = filters.len(),
            charsets = ?charsets,
            "Application built"
        );

        Ok(Application {
            mapper,
            collections,
            filters,
            codecs: self.codecs.unwrap_or_default(),
            charsets,
            public_url: self.public_url,
        })
    }
}
