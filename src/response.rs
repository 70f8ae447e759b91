use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::ContentRange;

use crate::ByteRange;

/// Every document goes out with this content type, regardless of extension.
pub const CONTENT_TYPE_PDF: &str = "application/pdf";

/// Status line and headers for a range response, computed before any body
/// bytes are read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Computes status and headers for sending `range` of a file of `file_size`
/// bytes.
///
/// When the client sent a `Range` header at all, the answer is
/// `206 Partial Content` with a `Content-Range`, even if the header could not
/// be parsed and the whole file was selected. Without one it is `200 OK` and
/// `Content-Range` is left out.
pub fn build(range: &ByteRange, file_size: u64, range_requested: bool) -> ResponseHead {
    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(range.len()));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PDF));

    let status = if range_requested {
        headers.insert(CONTENT_RANGE, content_range(range, file_size));
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    ResponseHead { status, headers }
}

// Formatted by hand rather than through `ContentRange::bytes`, which refuses
// an end past the complete length. Only ASCII digits, a space and `-/` go
// in, so the value is always built from a valid header string.
fn content_range(range: &ByteRange, file_size: u64) -> HeaderValue {
    let value = format!("bytes {}-{}/{}", range.start, range.end, file_size);
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("bytes */*"))
}

/// Error type indicating that the requested range was not satisfiable for a
/// file of the contained size. Implements [`IntoResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable(pub u64);

impl std::fmt::Display for RangeNotSatisfiable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "requested range not satisfiable for {} bytes", self.0)
    }
}

impl std::error::Error for RangeNotSatisfiable {}

impl IntoResponse for RangeNotSatisfiable {
    fn into_response(self) -> Response {
        let status = StatusCode::RANGE_NOT_SATISFIABLE;
        let header = TypedHeader(ContentRange::unsatisfied_bytes(self.0));
        (status, header, "Requested range not satisfiable").into_response()
    }
}

/// A computed [`ResponseHead`] paired with its body. Implements [`IntoResponse`].
#[derive(Debug)]
pub struct RangedResponse {
    pub head: ResponseHead,
    pub body: Body,
}

impl RangedResponse {
    pub fn new<B>(head: ResponseHead, body: B) -> Self
    where
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<axum::BoxError>,
    {
        RangedResponse { head, body: Body::new(body) }
    }
}

impl IntoResponse for RangedResponse {
    fn into_response(self) -> Response {
        let ResponseHead { status, headers } = self.head;
        (status, headers, self.body).into_response()
    }
}
