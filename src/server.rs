//! HTTP routes around the range engine.
//!
//! - `GET /` redirects to the listing.
//! - `GET /pdfs` lists the documents, linking to their downloads.
//! - `GET /pdfs/{filename}` streams a document, honouring `Range`.
//! - `GET /download/{filename}` sends a whole document as an attachment.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, RANGE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServeOptions;
use crate::{build, resolve, throttle, FileTarget, RangedResponse, ServeError};

type AppState = Arc<ServeOptions>;

// Everything but RFC 3986 unreserved characters is escaped in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Builds the application router. Route registration happens once here; the
/// returned router is handed to `axum::serve`.
pub fn router(options: ServeOptions) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/pdfs", get(list_documents))
        .route("/pdfs/{filename}", get(stream_document))
        .route("/download/{filename}", get(download_document))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(options))
}

async fn home() -> Redirect {
    Redirect::to("/pdfs")
}

async fn list_documents(State(options): State<AppState>) -> Result<Html<String>, ServeError> {
    let mut entries = match tokio::fs::read_dir(&options.root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ServeError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();

    let links: Vec<String> = names
        .iter()
        .map(|name| {
            let href = utf8_percent_encode(name, SEGMENT);
            let text = escape_html(name);
            format!(r#"<a href="/download/{href}">{text}</a>"#)
        })
        .collect();

    Ok(Html(links.join("<br>")))
}

async fn stream_document(
    State(options): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<RangedResponse, ServeError> {
    let target = FileTarget::lookup(document_path(&options.root, &filename)?).await?;

    // a header that is not visible ASCII still counts as sent, and falls
    // back to the whole file like any other unparseable value
    let range_header = headers.get(RANGE).map(|value| value.to_str().unwrap_or_default());

    let requested = resolve(range_header, target.size).inspect_err(|_| {
        debug!(%filename, range = ?range_header, size = target.size, "range not satisfiable");
    })?;
    let range = options.range_end.apply(requested, target.size);

    let stream = match options.streamer.open(&target, range).await {
        Ok(stream) => stream,
        // removed between lookup and open
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ServeError::NotFound),
        Err(e) => return Err(e.into()),
    };

    debug!(
        %filename,
        start = range.start,
        end = range.end,
        size = target.size,
        partial = range_header.is_some(),
        "streaming document",
    );

    let head = build(&range, target.size, range_header.is_some());
    let body = match options.throttle {
        Some(throttle_options) => Body::from_stream(throttle(stream, throttle_options)),
        None => Body::new(stream),
    };

    Ok(RangedResponse { head, body })
}

async fn download_document(
    State(options): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ServeError> {
    let path = document_path(&options.root, &filename)?;

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        return Err(ServeError::NotFound);
    }

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        info!(%filename, "sending attachment");
        response.headers_mut().insert(CONTENT_DISPOSITION, attachment(&filename));
    }

    Ok(response.into_response())
}

/// Maps a requested file name onto the document root. Names that could
/// escape the root are reported as not found.
fn document_path(root: &FsPath, filename: &str) -> Result<PathBuf, ServeError> {
    let rejected = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);

    if rejected {
        debug!(%filename, "rejected document name");
        return Err(ServeError::NotFound);
    }

    Ok(root.join(filename))
}

fn attachment(filename: &str) -> HeaderValue {
    let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{quoted}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
