//! Shared fixtures for integration tests: a small library with books and
//! reviews.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header, Method};
use rest_pipeline::collection::{CollectionSpec, MemoryCollection};
use rest_pipeline::http::Request;
use rest_pipeline::{Application, ApplicationBuilder, Resource, Value};

pub const BOOK_HINTS: &str = "
    review: type=review
    reviews: sequence, type=review
";

pub const BOOK_RULES: &str = "
    title(!type) <=> lower(!type)
    title <=> Title
    year <=> Year
    author <=> Author
    review <=> Review
    reviews <=> Reviews
";

pub const REVIEW_RULES: &str = "
    title(!type) <=> lower(!type)
    comment <=> Comment
";

/// The library application plus direct handles on its stores.
pub struct Library {
    pub app: Application,
    pub books: Arc<MemoryCollection>,
    pub reviews: Arc<MemoryCollection>,
}

pub fn library_builder() -> (ApplicationBuilder, Arc<MemoryCollection>, Arc<MemoryCollection>) {
    let books = Arc::new(MemoryCollection::new("books"));
    let reviews = Arc::new(MemoryCollection::new("reviews"));
    let builder = Application::builder()
        .public_url("http://library.test/")
        .collection(
            CollectionSpec::new("books", "book")
                .with_hints(BOOK_HINTS)
                .with_transform(BOOK_RULES),
            books.clone(),
        )
        .collection(
            CollectionSpec::new("reviews", "review").with_transform(REVIEW_RULES),
            reviews.clone(),
        );
    (builder, books, reviews)
}

pub fn library() -> Library {
    let (builder, books, reviews) = library_builder();
    Library {
        app: builder.build().expect("library application"),
        books,
        reviews,
    }
}

/// A book in the internal representation.
pub fn internal_book(title: &str) -> Resource {
    Resource::new("Book")
        .with("Title", title)
        .with("Year", "2010")
        .with("Author", "Book Author")
}

pub fn internal_book_with_reviews(title: &str, comments: &[&str]) -> Resource {
    let reviews: Vec<Value> = comments
        .iter()
        .map(|comment| Value::Resource(Resource::new("Review").with("Comment", *comment)))
        .collect();
    internal_book(title).with("Reviews", reviews)
}

pub fn get(target: &str) -> Request {
    Request::new(Method::GET, target).with_request_id("test")
}

pub fn send(method: Method, target: &str, content_type: &str, body: &str) -> Request {
    Request::new(method, target)
        .with_request_id("test")
        .with_header(header::CONTENT_TYPE, content_type)
        .with_body(body.to_string())
}

pub fn text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

pub const XML_BOOK: &str = r#"<?xml version="1.0" ?>
<book>
  <title>Book Title</title>
  <year>2010</year>
  <author>Book Author</author>
</book>
"#;

pub const XML_BOOK_WITH_REVIEWS: &str = r#"<?xml version="1.0" ?>
<book>
  <title>Book Title</title>
  <year>2010</year>
  <author>Book Author</author>
  <reviews>
    <review>
      <comment>Great book</comment>
    </review>
    <review>
      <comment>Very nice indeed</comment>
    </review>
  </reviews>
</book>
"#;

pub const YAML_BOOK_WITH_REVIEWS: &str = "!book
title: Book Title
year: !!str 2010
author: Book Author
reviews:
  - !review
    comment: Great book
  - !review
    comment: Very nice indeed
";

pub const JSON_BOOK_WITH_REVIEWS: &str = r#"{ "title": "Book Title", "year": "2010",
  "author": "Book Author",
  "reviews": [ { "comment": "Great book" }, { "comment": "Very nice indeed" } ] }"#;
