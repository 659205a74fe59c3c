use std::net::SocketAddr;

use axum::extract::{Request, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use axum_partial_content::{FsContentProvider, PartialContentHandler};

#[derive(Debug, Serialize)]
struct FileEntry {
    name: String,
    size: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let app = router(root);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    tracing::debug!(%addr, "server started");
    axum::serve(listener, app).await.unwrap();
}

fn router(root: String) -> Router {
    let handler = PartialContentHandler::new(FsContentProvider::new(&root));
    Router::new()
        .route("/files", get(list_files))
        .route(
            "/files/{name}",
            get(move |request: Request| async move { handler.handle(request).await }),
        )
        .with_state(root)
}

async fn list_files(State(root): State<String>) -> Json<Vec<FileEntry>> {
    let mut entries = Vec::new();
    if let Ok(mut dir) = tokio::fs::read_dir(&root).await {
        while let Ok(Some(entry)) = dir.next_entry().await {
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    entries.push(FileEntry {
                        name: entry.file_name().to_string_lossy().into_owned(),
                        size: meta.len(),
                    });
                }
            }
        }
    }
    Json(entries)
}
