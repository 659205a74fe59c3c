use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentLength, ContentRange};
use axum_extra::TypedHeader;
use tracing::debug;

use crate::content::{Content, ContentError, ContentProvider};
use crate::parse::parse_range_header;

/// Per-request orchestrator around a [`ContentProvider`].
///
/// For each request it resolves the content, parses the `Range` header
/// against the content size, and answers `200` with the full body or `206`
/// with the requested window, mapping a missing content to `404`, an
/// unsatisfiable range to `416`, and any other provider failure to `500`.
///
/// Cheap to clone; holds no per-request state.
pub struct PartialContentHandler<P> {
    provider: Arc<P>,
}

impl<P> Clone for PartialContentHandler<P> {
    fn clone(&self) -> Self {
        PartialContentHandler { provider: Arc::clone(&self.provider) }
    }
}

impl<P: ContentProvider> PartialContentHandler<P> {
    pub fn new(provider: P) -> Self {
        PartialContentHandler { provider: Arc::new(provider) }
    }

    /// Handles one request. Always produces a complete, well-formed response;
    /// provider and parse failures terminate the sequence at the stage where
    /// they occur.
    pub async fn handle(&self, request: Request) -> Response {
        let (parts, _) = request.into_parts();

        let content = match self.provider.provide(&parts).await {
            Ok(content) => content,
            Err(ContentError::NotFound(message)) => {
                debug!(%message, "content provider found nothing");
                return (StatusCode::NOT_FOUND, message).into_response();
            }
            Err(ContentError::Unexpected(error)) => {
                debug!(%error, "content provider failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let range_header = match parts.headers.get(header::RANGE) {
            None => None,
            Some(value) => match value.to_str() {
                Ok(raw) => Some(raw.to_owned()),
                Err(_) => {
                    // header bytes that are not a string cannot name a range
                    let header = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    return RangeNotSatisfiable::new(content.total_size(), header).into_response();
                }
            },
        };

        PartialContent::new(content, range_header).into_response()
    }
}

/// A [`Content`] paired with the raw `Range` header it was requested with.
/// The main responder type; implements [`IntoResponse`].
pub struct PartialContent<C> {
    content: C,
    range_header: Option<String>,
}

impl<C: Content> PartialContent<C> {
    pub fn new(content: C, range_header: Option<String>) -> Self {
        PartialContent { content, range_header }
    }

    /// Computes headers and body, returning them as
    /// [`PartialContentResponse`]. Fails with [`RangeNotSatisfiable`] when
    /// the header names a range the content cannot satisfy.
    pub fn try_respond(self) -> Result<PartialContentResponse, RangeNotSatisfiable> {
        let total_size = self.content.total_size();

        let range = match parse_range_header(self.range_header.as_deref(), total_size) {
            Ok(range) => range,
            Err(error) => {
                debug!(%error, header = ?self.range_header, "rejecting range header");
                let header = self.range_header.unwrap_or_default();
                return Err(RangeNotSatisfiable::new(total_size, header));
            }
        };

        let content_type = header_value(self.content.mime_type(), "application/octet-stream");
        let content_disposition = header_value(
            &format!("attachment; filename=\"{}\"", self.content.file_name()),
            "attachment",
        );

        match range {
            None => {
                debug!(total_size, "no range found, returning full content");
                Ok(PartialContentResponse::Full {
                    content_type,
                    content_disposition,
                    content_length: ContentLength(total_size),
                    body: self.content.into_body(None),
                })
            }
            Some(range) => {
                debug!(start = range.start, end = range.end, total_size, "returning partial content");
                let content_range = ContentRange::bytes(range.start..range.end + 1, total_size)
                    .expect("ContentRange::bytes cannot fail for a resolved range");
                let content_length = if range.start == range.end { 0 } else { range.len() };
                Ok(PartialContentResponse::Partial {
                    content_type,
                    content_disposition,
                    content_range,
                    content_length: ContentLength(content_length),
                    body: self.content.into_body(Some(range)),
                })
            }
        }
    }
}

impl<C: Content> IntoResponse for PartialContent<C> {
    fn into_response(self) -> Response {
        self.try_respond().into_response()
    }
}

fn header_value(value: &str, fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(fallback))
}

/// Computed headers and body for a range response. Implements
/// [`IntoResponse`].
pub enum PartialContentResponse {
    /// The entire content, status 200.
    Full {
        content_type: HeaderValue,
        content_disposition: HeaderValue,
        content_length: ContentLength,
        body: Body,
    },
    /// A single byte window out of the content, status 206.
    Partial {
        content_type: HeaderValue,
        content_disposition: HeaderValue,
        content_range: ContentRange,
        content_length: ContentLength,
        body: Body,
    },
}

impl IntoResponse for PartialContentResponse {
    fn into_response(self) -> Response {
        use PartialContentResponse::*;

        match self {
            Full { content_type, content_disposition, content_length, body } => (
                StatusCode::OK,
                TypedHeader(AcceptRanges::bytes()),
                TypedHeader(content_length),
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, content_disposition),
                ],
                body,
            )
                .into_response(),
            Partial {
                content_type,
                content_disposition,
                content_range,
                content_length,
                body,
            } => (
                StatusCode::PARTIAL_CONTENT,
                TypedHeader(AcceptRanges::bytes()),
                TypedHeader(content_range),
                TypedHeader(content_length),
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, content_disposition),
                    (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
                ],
                body,
            )
                .into_response(),
        }
    }
}

/// Error responder for ranges the content cannot satisfy: status 416 with
/// `Content-Range: bytes */<size>` and a body naming the offending header.
#[derive(Debug, Clone)]
pub struct RangeNotSatisfiable {
    total_size: u64,
    header: String,
}

impl RangeNotSatisfiable {
    pub fn new(total_size: u64, header: impl Into<String>) -> Self {
        RangeNotSatisfiable { total_size, header: header.into() }
    }
}

impl IntoResponse for RangeNotSatisfiable {
    fn into_response(self) -> Response {
        (
            StatusCode::RANGE_NOT_SATISFIABLE,
            TypedHeader(ContentRange::unsatisfied_bytes(self.total_size)),
            format!("Invalid value for Range: {}", self.header),
        )
            .into_response()
    }
}
