use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use tokio::fs::File;
use tracing::debug;

use crate::content::{Content, ContentError, ContentProvider};
use crate::parse::ByteRange;
use crate::stream::RangedStream;

/// Serves files from a root directory, resolving the final segment of the
/// request path against it.
#[derive(Debug, Clone)]
pub struct FsContentProvider {
    root: PathBuf,
}

impl FsContentProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsContentProvider { root: root.into() }
    }
}

#[async_trait]
impl ContentProvider for FsContentProvider {
    type Content = FileContent;

    async fn provide(&self, request: &Parts) -> Result<FileContent, ContentError> {
        let path = request.uri.path();
        let name = file_name_of(path)
            .ok_or_else(|| ContentError::not_found(format!("File doesn't exist: {path}")))?;
        FileContent::open(self.root.join(name)).await
    }
}

/// Extracts the final path segment, refusing anything that could escape the
/// root directory.
fn file_name_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name)
}

/// A file opened for a single response, sized up front.
#[derive(Debug)]
pub struct FileContent {
    file: File,
    total_size: u64,
    mime_type: String,
    file_name: String,
}

impl FileContent {
    /// Opens `path` and sizes it via its metadata, guessing the mime type
    /// from the extension. A missing file maps to [`ContentError::NotFound`].
    pub async fn open(path: impl Into<PathBuf>) -> Result<FileContent, ContentError> {
        let path = path.into();
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ContentError::not_found(format!(
                    "File doesn't exist: {}",
                    path.display()
                )));
            }
            Err(err) => return Err(ContentError::unexpected(err)),
        };
        let total_size = file.metadata().await.map_err(ContentError::unexpected)?.len();
        let mime_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(file = %path.display(), total_size, mime_type, "opened file content");

        Ok(FileContent { file, total_size, mime_type, file_name })
    }
}

impl Content for FileContent {
    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn into_body(self, range: Option<ByteRange>) -> Body {
        let (start, length) = match range {
            None => (0, self.total_size),
            Some(range) => (range.start, range.len()),
        };
        Body::new(RangedStream::new(self.file, start, length))
    }
}
