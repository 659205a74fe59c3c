//! # axum-partial-content
//!
//! Partial content (HTTP range) responses for [`axum`][1], backed by
//! pluggable content providers.
//!
//! A [`ContentProvider`] resolves each request to a piece of [`Content`]: a
//! sized, named, mime-typed source of bytes that can produce a body for an
//! optional byte window. [`PartialContentHandler`] drives the request: it
//! parses the `Range` header against the content size, answers `200` with
//! the full body or `206` with the requested window plus the matching
//! `Content-Range`, `Content-Length`, `Accept-Ranges` and caching headers,
//! and maps missing content to `404`, unsatisfiable ranges to `416`, and any
//! other provider failure to `500`.
//!
//! The crate ships two providers: [`FsContentProvider`] serving files from a
//! directory, and [`MemoryContent`] for byte buffers. Custom providers only
//! need to implement the two small traits.
//!
//! ```
//! use axum::Router;
//! use axum::extract::Request;
//! use axum::routing::get;
//!
//! use axum_partial_content::{FsContentProvider, PartialContentHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = PartialContentHandler::new(FsContentProvider::new("files"));
//!
//!     let _app: Router = Router::new().route(
//!         "/files/{name}",
//!         get(move |request: Request| async move { handler.handle(request).await }),
//!     );
//! }
//! ```
//!
//! [1]: https://docs.rs/axum

mod content;
mod fs;
mod handler;
mod parse;
mod stream;

pub use content::{BoxError, Content, ContentError, ContentProvider, MemoryContent};
pub use fs::{FileContent, FsContentProvider};
pub use handler::{
    PartialContent, PartialContentHandler, PartialContentResponse, RangeNotSatisfiable,
};
pub use parse::{parse_range_header, ByteRange, RangeParseError};
pub use stream::{AsyncSeekStart, RangedStream};
