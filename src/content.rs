use std::io;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use bytes::Bytes;

use crate::parse::ByteRange;

/// Boxed error for failures the handler reports but does not inspect.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure modes of a [`ContentProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The requested content does not exist. Answered with `404 Not Found`
    /// and the message as the response body.
    #[error("{0}")]
    NotFound(String),

    /// Any other provider failure. Answered with `500 Internal Server Error`
    /// and an empty body; the cause stays in the server log.
    #[error("content provider failed")]
    Unexpected(#[source] BoxError),
}

impl ContentError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ContentError::NotFound(message.into())
    }

    pub fn unexpected(error: impl Into<BoxError>) -> Self {
        ContentError::Unexpected(error.into())
    }
}

/// Content resolved for a single request: a sized, named, mime-typed source
/// of bytes.
///
/// A value is created fresh per request and consumed when its body is taken.
/// [`into_body`](Content::into_body) must yield exactly the bytes
/// `range.start..=range.end` when a range is given, and the entire content
/// otherwise.
pub trait Content: Send + 'static {
    /// Total size of the content in bytes.
    fn total_size(&self) -> u64;

    /// Mime type sent in the `Content-Type` header.
    fn mime_type(&self) -> &str;

    /// File name sent in the `Content-Disposition` header.
    fn file_name(&self) -> &str;

    /// Consumes the content, returning a body for the requested window.
    fn into_body(self, range: Option<ByteRange>) -> Body;
}

/// Resolves an incoming request head to a piece of [`Content`].
#[async_trait]
pub trait ContentProvider: Send + Sync + 'static {
    type Content: Content;

    async fn provide(&self, request: &Parts) -> Result<Self::Content, ContentError>;
}

const CHUNK_SIZE: usize = 64 * 1024;

/// In-memory [`Content`] over a byte buffer, for small blobs and tests.
#[derive(Debug, Clone)]
pub struct MemoryContent {
    bytes: Bytes,
    mime_type: String,
    file_name: String,
}

impl MemoryContent {
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        MemoryContent {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }
}

impl Content for MemoryContent {
    fn total_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn into_body(self, range: Option<ByteRange>) -> Body {
        let mut bytes = match range {
            None => self.bytes,
            Some(range) => {
                let end = (range.end + 1).min(self.bytes.len() as u64) as usize;
                let start = (range.start as usize).min(end);
                self.bytes.slice(start..end)
            }
        };
        Body::from_stream(async_stream::stream! {
            while !bytes.is_empty() {
                let take = bytes.len().min(CHUNK_SIZE);
                yield Ok::<_, io::Error>(bytes.split_to(take));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    async fn collect(body: Body) -> Vec<u8> {
        let mut stream = body.into_data_stream();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await.transpose().unwrap() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn full_body_yields_everything() {
        let content = MemoryContent::new(&b"0123456789"[..], "text/plain", "file.txt");
        assert_eq!(content.total_size(), 10);
        assert_eq!(collect(content.into_body(None)).await, b"0123456789".to_vec());
    }

    #[tokio::test]
    async fn ranged_body_yields_the_inclusive_window() {
        let content = MemoryContent::new(&b"0123456789"[..], "text/plain", "file.txt");
        let body = content.into_body(Some(ByteRange::new(2, 6)));
        assert_eq!(collect(body).await, b"23456".to_vec());
    }

    #[tokio::test]
    async fn single_byte_range_yields_one_byte() {
        let content = MemoryContent::new(&b"0123456789"[..], "text/plain", "file.txt");
        let body = content.into_body(Some(ByteRange::new(5, 5)));
        assert_eq!(collect(body).await, b"5".to_vec());
    }

    #[tokio::test]
    async fn empty_content_yields_an_empty_body() {
        let content = MemoryContent::new(Bytes::new(), "text/plain", "empty.txt");
        assert_eq!(content.total_size(), 0);
        assert_eq!(collect(content.into_body(None)).await, Vec::<u8>::new());
    }
}
