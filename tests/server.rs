use std::net::SocketAddr;
use std::path::Path;

use axum::extract::Request;
use axum::routing::get;
use axum::Router;

use axum_partial_content::{FsContentProvider, PartialContentHandler};

const FIXTURE: &[u8] = b"Hello world this is a file to test range requests on!\n";

async fn spawn_server(root: &Path) -> SocketAddr {
    let handler = PartialContentHandler::new(FsContentProvider::new(root));
    let app = Router::new().route(
        "/files/{name}",
        get(move |request: Request| async move { handler.handle(request).await }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn serves_full_content() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixture.txt"), FIXTURE).unwrap();
    let addr = spawn_server(dir.path()).await;

    let response = reqwest::get(format!("http://{addr}/files/fixture.txt")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["accept-ranges"], "bytes");
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"fixture.txt\""
    );
    assert_eq!(response.headers()["content-length"], "54");
    assert!(response.headers().get("content-range").is_none());
    assert_eq!(response.bytes().await.unwrap().as_ref(), FIXTURE);
}

#[tokio::test]
async fn serves_partial_content() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixture.txt"), FIXTURE).unwrap();
    let addr = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/files/fixture.txt");

    let response = client.get(&url).header("Range", "bytes=0-4").send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 0-4/54");
    assert_eq!(response.headers()["content-length"], "5");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"Hello");

    let response = client.get(&url).header("Range", "bytes=-4").send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 50-53/54");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"on!\n");

    let response = client.get(&url).header("Range", "bytes=30-").send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 30-53/54");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"test range requests on!\n");
}

#[tokio::test]
async fn rejects_unsatisfiable_ranges() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixture.txt"), FIXTURE).unwrap();
    let addr = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/files/fixture.txt"))
        .header("Range", "bytes=30-10")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()["content-range"], "bytes */54");
    assert_eq!(
        response.text().await.unwrap(),
        "Invalid value for Range: bytes=30-10"
    );
}

#[tokio::test]
async fn missing_files_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path()).await;

    let response = reqwest::get(format!("http://{addr}/files/nope.txt")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().starts_with("File doesn't exist"));
}
