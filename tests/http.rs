//! End-to-end tests driving the router in-process.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use sidegate::{app, listing, paths::RelativePath, AppState, ServerConfig};
use futures_util::stream;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "sidegate-test-boundary";

fn setup() -> (TempDir, ServerConfig, Router) {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig::new(temp_dir.path()).unwrap();
    let router = app(AppState::new(config.clone()));
    (temp_dir, config, router)
}

fn write_with_mode(path: &Path, contents: &str, mode: u32) {
    fs::write(path, contents).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

fn mkdir_public(path: &Path) {
    fs::create_dir_all(path).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Builds a multipart body with one `file` part per `(filename, contents)`.
fn multipart_body(files: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, contents) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{contents}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn upload_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn root_redirects_to_browse() {
    let (_temp_dir, _config, router) = setup();
    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/browse/");
}

#[tokio::test]
async fn browse_empty_root() {
    let (_temp_dir, config, router) = setup();
    let response = router.oneshot(get("/browse/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(page.contains("Upload a File"));
    assert!(page.contains(config.root_label()));
    assert!(page.contains("Nothing to show here."));
}

#[tokio::test]
async fn browse_without_trailing_slash() {
    let (_temp_dir, _config, router) = setup();
    let response = router.oneshot(get("/browse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn browse_missing_directory_still_renders() {
    let (_temp_dir, _config, router) = setup();
    let response = router.oneshot(get("/browse/does/not/exist")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Nothing to show here."));
}

#[tokio::test]
async fn upload_browse_download_round_trip() {
    let (_temp_dir, config, router) = setup();
    mkdir_public(&config.root().join("sub"));

    let response = router
        .clone()
        .oneshot(upload_request("/upload/sub", multipart_body(&[("f.txt", "hello")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/browse/sub");
    assert_eq!(fs::read_to_string(config.root().join("sub/f.txt")).unwrap(), "hello");

    let view = listing::list(&config, &RelativePath::parse("sub").unwrap()).await;
    let entry = view.entries.iter().find(|e| e.name == "f.txt").unwrap();
    assert!(!entry.is_dir);
    assert_eq!(entry.display_size, "5 bytes");

    let page = body_string(router.clone().oneshot(get("/browse/sub")).await.unwrap()).await;
    assert!(page.contains(r#"href="/download/sub/f.txt""#));
    assert!(page.contains("5 bytes"));

    let response = router.oneshot(get("/download/sub/f.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_string(response).await, "hello");
}

#[tokio::test]
async fn upload_to_root_redirects_to_root() {
    let (_temp_dir, config, router) = setup();
    let response = router
        .oneshot(upload_request("/upload/", multipart_body(&[("top.txt", "x")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/browse/");
    assert!(config.root().join("top.txt").is_file());
}

#[tokio::test]
async fn upload_multiple_files_in_one_request() {
    let (_temp_dir, config, router) = setup();
    let body = multipart_body(&[("one.txt", "1"), ("two.txt", "22"), ("three.txt", "333")]);
    let response = router.oneshot(upload_request("/upload", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    assert_eq!(fs::read_to_string(config.root().join("one.txt")).unwrap(), "1");
    assert_eq!(fs::read_to_string(config.root().join("two.txt")).unwrap(), "22");
    assert_eq!(fs::read_to_string(config.root().join("three.txt")).unwrap(), "333");
}

#[tokio::test]
async fn upload_overwrites_existing_file() {
    let (_temp_dir, config, router) = setup();
    write_with_mode(&config.root().join("f.txt"), "old contents", 0o644);

    let response = router
        .oneshot(upload_request("/upload", multipart_body(&[("f.txt", "new")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(fs::read_to_string(config.root().join("f.txt")).unwrap(), "new");
}

#[tokio::test]
async fn upload_skips_empty_file_inputs() {
    let (_temp_dir, config, router) = setup();
    let response = router
        .oneshot(upload_request("/upload", multipart_body(&[("", "")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(fs::read_dir(config.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_into_missing_directory_fails() {
    let (_temp_dir, _config, router) = setup();
    let response = router
        .oneshot(upload_request("/upload/nowhere", multipart_body(&[("f.txt", "x")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Unable to create file on disk");
}

#[tokio::test]
async fn upload_without_multipart_body_fails() {
    let (_temp_dir, _config, router) = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn upload_rejects_traversal_in_filename() {
    let (_temp_dir, config, router) = setup();
    let response = router
        .oneshot(upload_request("/upload", multipart_body(&[("../escape.txt", "x")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(fs::read_dir(config.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_rejects_traversal_in_destination() {
    let (_temp_dir, _config, router) = setup();
    let response = router
        .oneshot(upload_request("/upload/../..", multipart_body(&[("f.txt", "x")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn concurrent_uploads_to_same_directory() {
    let (_temp_dir, config, router) = setup();

    let (a, b) = tokio::join!(
        router
            .clone()
            .oneshot(upload_request("/upload", multipart_body(&[("a.txt", "aaa")]))),
        router
            .clone()
            .oneshot(upload_request("/upload", multipart_body(&[("b.txt", "bbbb")]))),
    );
    assert_eq!(a.unwrap().status(), StatusCode::FOUND);
    assert_eq!(b.unwrap().status(), StatusCode::FOUND);

    let view = listing::list(&config, &RelativePath::root()).await;
    let names: Vec<_> = view.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn download_rejects_traversal() {
    let (_temp_dir, _config, router) = setup();
    for uri in [
        "/download/../../etc/passwd",
        "/download/%2e%2e/%2e%2e/etc/passwd",
        "/download/sub/..%2F..%2Fetc%2Fpasswd",
    ] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body_string(response).await, "Access denied");
    }
}

#[tokio::test]
async fn unreadable_file_is_hidden_and_not_downloadable() {
    let (_temp_dir, config, router) = setup();
    write_with_mode(&config.root().join("secret.txt"), "top secret", 0o600);
    write_with_mode(&config.root().join("public.txt"), "hi", 0o644);

    let page = body_string(router.clone().oneshot(get("/browse/")).await.unwrap()).await;
    assert!(page.contains("public.txt"));
    assert!(!page.contains("secret.txt"));

    let response = router.oneshot(get("/download/secret.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "File is not readable");
}

#[tokio::test]
async fn download_missing_file_fails() {
    let (_temp_dir, _config, router) = setup();
    let response = router.oneshot(get("/download/ghost.bin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn download_directory_redirects_to_listing() {
    let (_temp_dir, config, router) = setup();
    mkdir_public(&config.root().join("photos"));
    let response = router.oneshot(get("/download/photos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/browse/photos");
}

#[tokio::test]
async fn download_percent_encoded_name() {
    let (_temp_dir, config, router) = setup();
    write_with_mode(&config.root().join("my notes.md"), "# notes", 0o644);
    let response = router.oneshot(get("/download/my%20notes.md")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"my notes.md\""
    );
    assert_eq!(body_string(response).await, "# notes");
}

#[tokio::test]
async fn bare_download_prefix_redirects_to_root_listing() {
    let (_temp_dir, _config, router) = setup();
    for uri in ["/download", "/download/"] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&response), "/browse/");
    }
}

#[tokio::test]
async fn hidden_directory_is_closed_to_browse_and_download() {
    let (_temp_dir, config, router) = setup();
    mkdir_public(&config.root().join("closed"));
    write_with_mode(&config.root().join("closed/inside.txt"), "private", 0o644);
    fs::set_permissions(config.root().join("closed"), fs::Permissions::from_mode(0o750)).unwrap();

    let page = body_string(router.clone().oneshot(get("/browse/")).await.unwrap()).await;
    assert!(!page.contains("closed"));

    let response = router.clone().oneshot(get("/browse/closed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(!page.contains("inside.txt"));
    assert!(page.contains("Nothing to show here."));

    let response = router.oneshot(get("/download/closed/inside.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "File is not readable");
}

#[tokio::test]
async fn upload_interrupted_mid_transfer_fails_cleanly() {
    let (_temp_dir, _config, router) = setup();

    let head = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    );
    let chunks: Vec<Result<Bytes, io::Error>> = vec![
        Ok(Bytes::from(head)),
        Ok(Bytes::from(vec![b'a'; 64 * 1024])),
        Ok(Bytes::from(vec![b'b'; 64 * 1024])),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ];
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from_stream(stream::iter(chunks)))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Unable to get file data from request");

    // The server keeps answering after the failed transfer.
    let response = router
        .oneshot(upload_request("/upload", multipart_body(&[("ok.txt", "fine")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}
