//! # pdf-range-server
//!
//! Serves a directory of documents over HTTP, with single-range partial
//! content for the streaming endpoint.
//!
//! The range engine is three pieces:
//!
//! - [`resolve`] turns a raw `Range` header and a file size into a
//!   [`ByteRange`], or [`RangeNotSatisfiable`].
//! - [`RangedStream`] reads exactly that window from any [`RangeBody`] in
//!   bounded chunks. [`FileStreamer::open`] builds one over a file on disk.
//! - [`build`] computes the status and headers for the window.
//!
//! Any type implementing both [`AsyncRead`] and [`AsyncSeekStart`] can be
//! given a fixed size with the [`KnownSize`] adapter. [`AsyncSeekStart`] only
//! allows seeking from the start of a body, and is implemented for every
//! [`AsyncSeek`].
//!
//! ```no_run
//! use axum::http::HeaderMap;
//! use axum::response::IntoResponse;
//! use pdf_range_server::{build, resolve, FileStreamer, FileTarget, RangedResponse};
//!
//! async fn serve(headers: HeaderMap) -> axum::response::Response {
//!     let target = FileTarget::lookup("static/pdfs/manual.pdf").await.unwrap();
//!     let raw = headers.get("range").map(|v| v.to_str().unwrap_or_default());
//!     let range = match resolve(raw, target.size) {
//!         Ok(range) => range,
//!         Err(e) => return e.into_response(),
//!     };
//!     let stream = FileStreamer::default().open(&target, range).await.unwrap();
//!     let head = build(&range, target.size, raw.is_some());
//!     RangedResponse::new(head, stream).into_response()
//! }
//! ```

mod file;
mod range;
mod response;
mod stream;

pub mod config;
pub mod error;
pub mod server;
pub mod throttle;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncSeek};

pub use error::ServeError;
pub use file::{FileTarget, KnownSize};
pub use range::{parse_range_header, resolve, RangeEndPolicy};
pub use response::{build, RangeNotSatisfiable, RangedResponse, ResponseHead, CONTENT_TYPE_PDF};
pub use stream::{FileStreamer, RangedStream, DEFAULT_CHUNK_SIZE};
pub use throttle::{throttle, Throttle};

/// [`AsyncSeek`] narrowed to only allow seeking from start.
pub trait AsyncSeekStart {
    /// Same semantics as [`AsyncSeek::start_seek`], always passing position as the `SeekFrom::Start` variant.
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    /// Same semantics as [`AsyncSeek::poll_complete`], returning `()` instead of the new stream position.
    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsyncSeek> AsyncSeekStart for T {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        AsyncSeek::start_seek(self, io::SeekFrom::Start(position))
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncSeek::poll_complete(self, cx).map_ok(|_| ())
    }
}

/// An [`AsyncRead`] and [`AsyncSeekStart`] with a fixed known byte size.
pub trait RangeBody: AsyncRead + AsyncSeekStart {
    /// The total size of the underlying file.
    ///
    /// This should not change for the lifetime of the object once queried.
    /// Behaviour is not guaranteed if it does change.
    fn byte_size(&self) -> u64;
}

/// A single byte window, zero-based with both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a new byte range. `start` must not be greater than `end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "byte range start {start} past end {end}");
        ByteRange { start, end }
    }

    /// The whole of a non-empty body.
    pub fn full(byte_size: u64) -> Option<Self> {
        byte_size.checked_sub(1).map(|end| ByteRange { start: 0, end })
    }

    /// Number of bytes covered, never zero. Saturates at `u64::MAX` for the
    /// one window too long to count, `0..=u64::MAX`.
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Pull `end` back to the last byte of a body of `byte_size` bytes.
    ///
    /// Only meaningful for ranges already resolved against that size, where
    /// `start < byte_size` holds.
    pub fn clamp_to(self, byte_size: u64) -> Self {
        match byte_size.checked_sub(1) {
            Some(last) if self.end > last => ByteRange { start: self.start, end: last },
            _ => self,
        }
    }
}
