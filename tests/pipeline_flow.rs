//! End-to-end behaviour of the request pipeline, without a socket.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderValue, Method, StatusCode};
use rest_pipeline::collection::{ActionCall, Collection, CollectionSpec};
use rest_pipeline::error::{ActionError, Fault, HttpReturn};
use rest_pipeline::pipeline::{
    priority, ExceptionHandler, InputFilter, OutputFilter, RequestContext,
};
use rest_pipeline::{Application, ApplicationBuilder, Entity, Resource};
use tracing_subscriber::fmt::MakeWriter;

mod common;

use common::*;

const BOOK_JSON: &str =
    r#"{"!type":"book","author":"Book Author","title":"Book Title","year":"2010"}"#;

#[test]
fn test_create_stores_internal_resource_and_locates_it() {
    let library = library();
    let response = library
        .app
        .handle(&send(Method::POST, "/api/books", "text/xml", XML_BOOK));

    assert_eq!(response.status, StatusCode::CREATED, "{}", text(&response.body));
    assert_eq!(
        response.header("location"),
        Some("http://library.test/api/books/1")
    );
    assert!(response.header("content-location").is_none());
    assert!(response.body.is_empty());
    assert_eq!(library.books.len(), 1);

    let shown = library.app.handle(
        &get("/api/books/1").with_header(header::ACCEPT, "application/json"),
    );
    assert_eq!(text(&shown.body), BOOK_JSON);
}

#[test]
fn test_create_from_yaml_with_reviews() {
    let library = library();
    let response = library.app.handle(&send(
        Method::POST,
        "/api/books",
        "text/x-yaml; charset=utf-8",
        YAML_BOOK_WITH_REVIEWS,
    ));
    assert_eq!(response.status, StatusCode::CREATED, "{}", text(&response.body));
    assert!(library.reviews.is_empty());
}

#[test]
fn test_show_negotiates_json() {
    let library = library();
    library.books.insert(internal_book("Book Title")).unwrap();

    let response = library.app.handle(
        &get("/api/books/1").with_header(header::ACCEPT, "text/xml;q=0.5, application/json"),
    );
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(text(&response.body), BOOK_JSON);
}

#[test]
fn test_show_defaults_to_xml() {
    let library = library();
    library.books.insert(internal_book("Book Title")).unwrap();

    let response = library.app.handle(&get("/api/books/1"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("text/xml; charset=utf-8"));
    let body = text(&response.body);
    assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"), "{}", body);
    assert!(body.contains("<title>Book Title</title>"), "{}", body);
}

#[test]
fn test_list_wraps_items_in_collection_element() {
    let library = library();
    library.books.insert(internal_book("Dune")).unwrap();
    library.books.insert(internal_book("Emma")).unwrap();

    let response = library.app.handle(&get("/api/books"));
    assert_eq!(response.status, StatusCode::OK);
    let body = text(&response.body);
    assert!(body.contains("<books>\n  <book>"), "{}", body);
    assert!(body.find("Dune").unwrap() < body.find("Emma").unwrap());
}

#[test]
fn test_update_and_delete() {
    let library = library();
    library.books.insert(internal_book("Draft")).unwrap();

    let updated = library.app.handle(&send(
        Method::PUT,
        "/api/books/1",
        "application/json",
        r#"{"title": "Final"}"#,
    ));
    assert_eq!(updated.status, StatusCode::NO_CONTENT, "{}", text(&updated.body));

    let shown = library.app.handle(
        &get("/api/books/1").with_header(header::ACCEPT, "application/json"),
    );
    assert_eq!(text(&shown.body), r#"{"!type":"book","title":"Final"}"#);

    let deleted = library
        .app
        .handle(&rest_pipeline::http::Request::new(Method::DELETE, "/api/books/1"));
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(library.books.is_empty());

    let gone = library.app.handle(&get("/api/books/1"));
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_unrouted_and_unknown_collection_are_404() {
    let library = library();
    assert_eq!(library.app.handle(&get("/")).status, StatusCode::NOT_FOUND);
    assert_eq!(
        library.app.handle(&get("/api/films")).status,
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_unmapped_method_is_405_with_allow() {
    let library = library();
    let response = library
        .app
        .handle(&rest_pipeline::http::Request::new(Method::PATCH, "/api/books"));
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));

    let response = library
        .app
        .handle(&rest_pipeline::http::Request::new(Method::POST, "/api/books/1"));
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, PUT, DELETE"));
}

#[test]
fn test_unacceptable_representation_is_406() {
    let library = library();
    library.books.insert(internal_book("Book Title")).unwrap();

    let response = library
        .app
        .handle(&get("/api/books/1").with_header(header::ACCEPT, "text/csv"));
    assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);

    let response = library
        .app
        .handle(&get("/api/books/1").with_header(header::ACCEPT_CHARSET, "koi8-r"));
    assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);
}

#[test]
fn test_request_entity_errors() {
    let library = library();

    let unsupported = library
        .app
        .handle(&send(Method::POST, "/api/books", "text/csv", "title\nDune"));
    assert_eq!(unsupported.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let missing_type = library.app.handle(
        &rest_pipeline::http::Request::new(Method::POST, "/api/books").with_body(XML_BOOK),
    );
    assert_eq!(missing_type.status, StatusCode::BAD_REQUEST);

    let empty = library
        .app
        .handle(&send(Method::POST, "/api/books", "text/xml", ""));
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let malformed = library
        .app
        .handle(&send(Method::POST, "/api/books", "text/xml", "<book><title>"));
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let body_on_list = library.app.handle(&get("/api/books").with_body("<x/>"));
    assert_eq!(body_on_list.status, StatusCode::BAD_REQUEST);

    assert!(library.books.is_empty());
}

#[test]
fn test_invalid_input_answers_with_error_resource() {
    let library = library();
    let response = library.app.handle(
        &send(
            Method::POST,
            "/api/books",
            "application/json",
            r#"{"title": "Dune", "isbn": "978-0441013593"}"#,
        )
        .with_header(header::ACCEPT, "application/json"),
    );

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.header("content-type"),
        Some("application/json; charset=utf-8")
    );
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["!type"], "error");
    assert_eq!(body["id"], "rest.entity_error");
    assert!(body["message"].as_str().unwrap().contains("isbn"));
}

#[derive(Debug)]
struct Teapot;

impl InputFilter for Teapot {
    fn filter(&self, _cx: &mut RequestContext<'_>, _input: Entity) -> Result<Entity, Fault> {
        Err(HttpReturn::new(StatusCode::IM_A_TEAPOT)
            .with_reason("short and stout")
            .into())
    }
}

#[derive(Debug, Default)]
struct Counting {
    calls: AtomicUsize,
}

impl Collection for Counting {
    fn supports(&self, _action: &str) -> bool {
        true
    }

    fn call(&self, action: &str, call: ActionCall) -> Result<Entity, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match action {
            "list" => Ok(Entity::from(vec![Resource::new("tag")
                .with("name", call.arg("name").unwrap_or("none"))])),
            "show" => Err(ActionError::failed(
                "backend unavailable",
                std::io::Error::other("connection refused"),
            )),
            _ => Err(ActionError::Invalid(format!("cannot {}", action))),
        }
    }
}

fn tags_app(
    configure: impl FnOnce(ApplicationBuilder) -> ApplicationBuilder,
) -> (Application, Arc<Counting>) {
    let tags = Arc::new(Counting::default());
    let builder =
        Application::builder().collection(CollectionSpec::new("tags", "tag"), tags.clone());
    (configure(builder).build().unwrap(), tags)
}

#[test]
fn test_input_filter_short_circuits_action() {
    let (app, tags) = tags_app(|b| b.input_filter("tags", "*", priority::HIGHEST, Arc::new(Teapot)));

    let response = app.handle(&get("/api/tags"));
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(text(&response.body), "short and stout");
    assert_eq!(tags.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_action_receives_query_and_path_arguments() {
    let (app, _) = tags_app(|b| b);
    let response = app.handle(
        &get("/api/tags?name=scifi").with_header(header::ACCEPT, "application/json"),
    );
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(text(&response.body), r#"[{"!type":"tag","name":"scifi"}]"#);
}

#[test]
fn test_unhandled_action_failure_is_500() {
    let (app, _) = tags_app(|b| b);
    let response = app.handle(&get("/api/tags/7"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text(&response.body).contains("backend unavailable"));
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_server_fault_log_keeps_source_chain() {
    let (app, _) = tags_app(|b| b);
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .finish();

    let response = tracing::subscriber::with_default(subscriber, || app.handle(&get("/api/tags/7")));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Request failed"), "{output}");
    assert!(
        output.contains("backend unavailable: connection refused"),
        "{output}"
    );
}

#[derive(Debug)]
struct Unavailable;

impl ExceptionHandler for Unavailable {
    fn handle(&self, _cx: &mut RequestContext<'_>, fault: Fault) -> Option<Fault> {
        match fault {
            Fault::Action(ActionError::Failed { .. }) => {
                Some(HttpReturn::new(StatusCode::SERVICE_UNAVAILABLE).into())
            }
            other => Some(other),
        }
    }
}

#[test]
fn test_exception_handler_translates_fault() {
    let (app, _) = tags_app(|b| b.exception_handler("*", "show", priority::HIGHEST, Arc::new(Unavailable)));
    let response = app.handle(&get("/api/tags/7"));
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text(&response.body), "Service Unavailable");
}

#[derive(Debug)]
struct Stamp;

impl OutputFilter for Stamp {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault> {
        cx.response
            .headers
            .insert("x-collection", HeaderValue::from_static("tags"));
        Ok(output)
    }
}

#[test]
fn test_output_filter_may_only_set_headers() {
    let (app, _) = tags_app(|b| b.output_filter("tags", "list", priority::LOWEST, Arc::new(Stamp)));
    let response = app.handle(&get("/api/tags"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-collection"), Some("tags"));
    assert!(!response.body.is_empty());
}

#[test]
fn test_without_standard_filters_output_is_unformatted() {
    let (app, _) = tags_app(|b| b.standard_filters(false));
    let response = app.handle(&get("/api/tags"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_charset_preference_applies_to_output() {
    let (builder, books, _) = library_builder();
    let app = builder.charsets(["iso-8859-1", "utf-8"]).build().unwrap();
    books
        .insert(Resource::new("Book").with("Title", "Caf\u{e9}"))
        .unwrap();

    let response = app.handle(&get("/api/books/1").with_header(header::ACCEPT, "application/json"));
    assert_eq!(
        response.header("content-type"),
        Some("application/json; charset=iso-8859-1")
    );
    assert_eq!(&response.body[..], b"{\"!type\":\"book\",\"title\":\"Caf\xe9\"}");

    let response = app.handle(
        &get("/api/books/1")
            .with_header(header::ACCEPT, "application/json")
            .with_header(header::ACCEPT_CHARSET, "utf-8, iso-8859-1;q=0"),
    );
    assert_eq!(
        response.header("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(text(&response.body), "{\"!type\":\"book\",\"title\":\"Caf\u{e9}\"}");
}
