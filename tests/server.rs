use std::path::Path;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use pdf_range_server::config::ServeOptions;
use pdf_range_server::server::router;
use pdf_range_server::{RangeEndPolicy, Throttle};

const FIXTURE: &[u8] = b"Hello world this is a file to test range requests on!\n";

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn docs() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixture.pdf"), FIXTURE).unwrap();
    std::fs::write(dir.path().join("big.pdf"), pattern(10000)).unwrap();
    std::fs::write(dir.path().join("empty.pdf"), b"").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    dir
}

fn app(root: &Path) -> Router {
    router(ServeOptions::new(root))
}

async fn get(app: Router, uri: &str, range: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(range) = range {
        request = request.header("Range", range);
    }
    app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).map(|v| v.to_str().unwrap())
}

#[tokio::test]
async fn test_partial_response() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=0-29")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 0-29/54"), header(&response, "content-range"));
    assert_eq!(Some("bytes"), header(&response, "accept-ranges"));
    assert_eq!(Some("30"), header(&response, "content-length"));
    assert_eq!(Some("application/pdf"), header(&response, "content-type"));
    assert_eq!(b"Hello world this is a file to ".to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_no_range_header_is_full_ok() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", None).await;

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(None, header(&response, "content-range"));
    assert_eq!(Some("54"), header(&response, "content-length"));
    assert_eq!(Some("bytes"), header(&response, "accept-ranges"));
    assert_eq!(FIXTURE.to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_malformed_range_is_full_partial() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=abc-xyz")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 0-53/54"), header(&response, "content-range"));
    assert_eq!(Some("54"), header(&response, "content-length"));
    assert_eq!(FIXTURE.to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_non_ascii_range_is_full_partial() {
    let dir = docs();
    let request = Request::builder()
        .uri("/pdfs/fixture.pdf")
        .header("Range", HeaderValue::from_bytes(b"bytes=\xff-").unwrap())
        .body(Body::empty())
        .unwrap();
    let response = app(dir.path()).oneshot(request).await.unwrap();

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 0-53/54"), header(&response, "content-range"));
}

#[tokio::test]
async fn test_open_ended_range() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=40-")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 40-53/54"), header(&response, "content-range"));
    assert_eq!(b" requests on!\n".to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_last_byte() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=53-")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 53-53/54"), header(&response, "content-range"));
    assert_eq!(b"\n".to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_window_across_chunks() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/big.pdf", Some("bytes=500-9999")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("9500"), header(&response, "content-length"));
    assert_eq!(pattern(10000)[500..].to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_start_at_size_is_unsatisfiable() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=54-")).await;

    assert_eq!(StatusCode::RANGE_NOT_SATISFIABLE, response.status());
    assert_eq!(Some("bytes */54"), header(&response, "content-range"));
    assert_eq!(b"Requested range not satisfiable".to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_start_after_end_is_unsatisfiable() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=30-29")).await;
    assert_eq!(StatusCode::RANGE_NOT_SATISFIABLE, response.status());
}

#[tokio::test]
async fn test_empty_file_is_unsatisfiable() {
    let dir = docs();
    for range in [None, Some("bytes=0-"), Some("bytes=0-0")] {
        let response = get(app(dir.path()), "/pdfs/empty.pdf", range).await;
        assert_eq!(StatusCode::RANGE_NOT_SATISFIABLE, response.status(), "{range:?}");
    }
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = docs();
    for range in [None, Some("bytes=0-10"), Some("bytes=abc"), Some("bytes=99999-")] {
        let response = get(app(dir.path()), "/pdfs/missing.pdf", range).await;
        assert_eq!(StatusCode::NOT_FOUND, response.status(), "{range:?}");
        assert_eq!(b"File not found".to_vec(), body_bytes(response).await);
    }
}

#[tokio::test]
async fn test_directory_is_not_found() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/nested", Some("bytes=0-")).await;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let dir = docs();
    std::fs::write(dir.path().join("nested").join("inner.pdf"), FIXTURE).unwrap();
    let root = dir.path().join("nested");

    let response = get(app(&root), "/pdfs/..%2Ffixture.pdf", None).await;
    assert_eq!(StatusCode::NOT_FOUND, response.status());

    let response = get(app(&root), "/download/..%2Ffixture.pdf", None).await;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn test_end_past_file_is_clamped_by_default() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=30-99")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 30-53/54"), header(&response, "content-range"));
    assert_eq!(Some("24"), header(&response, "content-length"));
    assert_eq!(b"test range requests on!\n".to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_end_past_file_literal_policy() {
    let dir = docs();
    let mut options = ServeOptions::new(dir.path());
    options.range_end = RangeEndPolicy::Literal;

    let response = get(router(options), "/pdfs/fixture.pdf", Some("bytes=30-99")).await;

    // headers promise the requested window; the body cannot deliver it
    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 30-99/54"), header(&response, "content-range"));
    assert_eq!(Some("70"), header(&response, "content-length"));
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_unbounded_end_literal_policy() {
    let dir = docs();
    let mut options = ServeOptions::new(dir.path());
    options.range_end = RangeEndPolicy::Literal;

    let response = get(router(options), "/pdfs/fixture.pdf", Some("bytes=0-99999999999999999999999")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 0-18446744073709551615/54"), header(&response, "content-range"));
    assert_eq!(Some("18446744073709551615"), header(&response, "content-length"));
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_unbounded_end_is_clamped_by_default() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs/fixture.pdf", Some("bytes=0-99999999999999999999999")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("bytes 0-53/54"), header(&response, "content-range"));
    assert_eq!(FIXTURE.to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_throttled_stream_keeps_bytes() {
    let dir = docs();
    let mut options = ServeOptions::new(dir.path());
    options.throttle = Some(Throttle::new(Duration::from_millis(1)).with_chunk_size(1000));

    let response = get(router(options), "/pdfs/big.pdf", Some("bytes=100-4099")).await;

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("4000"), header(&response, "content-length"));
    assert_eq!(pattern(10000)[100..4100].to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_download_is_attachment() {
    let dir = docs();
    let response = get(app(dir.path()), "/download/fixture.pdf", None).await;

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(Some("attachment; filename=\"fixture.pdf\""), header(&response, "content-disposition"));
    assert_eq!(FIXTURE.to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_download_missing() {
    let dir = docs();
    let response = get(app(dir.path()), "/download/missing.pdf", None).await;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    assert_eq!(None, header(&response, "content-disposition"));
}

#[tokio::test]
async fn test_listing() {
    let dir = docs();
    let response = get(app(dir.path()), "/pdfs", None).await;

    assert_eq!(StatusCode::OK, response.status());
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(
        concat!(
            r#"<a href="/download/big.pdf">big.pdf</a><br>"#,
            r#"<a href="/download/empty.pdf">empty.pdf</a><br>"#,
            r#"<a href="/download/fixture.pdf">fixture.pdf</a>"#,
        ),
        html,
    );
}

#[tokio::test]
async fn test_listing_links_are_percent_encoded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report #1.pdf"), FIXTURE).unwrap();

    let response = get(app(dir.path()), "/pdfs", None).await;
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(r#"<a href="/download/report%20%231.pdf">report #1.pdf</a>"#, html);

    let response = get(app(dir.path()), "/download/report%20%231.pdf", None).await;
    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(FIXTURE.to_vec(), body_bytes(response).await);
}

#[tokio::test]
async fn test_listing_missing_root() {
    let dir = docs();
    let response = get(app(&dir.path().join("nope")), "/pdfs", None).await;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn test_home_redirects_to_listing() {
    let dir = docs();
    let response = get(app(dir.path()), "/", None).await;

    assert!(response.status().is_redirection());
    assert_eq!(Some("/pdfs"), header(&response, "location"));
}

#[tokio::test]
async fn test_cors() {
    let dir = docs();
    let request = Request::builder()
        .uri("/pdfs/fixture.pdf")
        .header("Origin", "http://viewer.example")
        .header("Range", "bytes=0-0")
        .body(Body::empty())
        .unwrap();
    let response = app(dir.path()).oneshot(request).await.unwrap();

    assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(Some("*"), header(&response, "access-control-allow-origin"));
    assert_eq!(b"H".to_vec(), body_bytes(response).await);
}
