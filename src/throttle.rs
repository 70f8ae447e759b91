//! Optional bandwidth throttling, applied as a wrapper around a byte stream.
//!
//! Off unless configured. Used for exercising slow-network behaviour of
//! viewers and download managers against a local server.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;

/// How to slow a stream down: every emitted piece is at most `chunk_size`
/// bytes and is preceded by a pause of `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub delay: Duration,
    pub chunk_size: usize,
}

impl Throttle {
    pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

    pub fn new(delay: Duration) -> Self {
        Throttle { delay, chunk_size: Throttle::DEFAULT_CHUNK_SIZE }
    }

    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Throttle { chunk_size: chunk_size.max(1), ..self }
    }
}

/// Re-splits `inner` into pieces of at most `throttle.chunk_size` bytes and
/// sleeps before yielding each one. Bytes and their order are unchanged; an
/// error from `inner` is passed through and ends the stream.
pub fn throttle<S>(inner: S, throttle: Throttle) -> impl Stream<Item = io::Result<Bytes>>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let Throttle { delay, chunk_size } = throttle;
    let chunk_size = chunk_size.max(1);

    async_stream::try_stream! {
        for await chunk in inner {
            let mut chunk: Bytes = chunk?;
            while !chunk.is_empty() {
                let piece = chunk.split_to(chunk.len().min(chunk_size));
                tokio::time::sleep(delay).await;
                yield piece;
            }
        }
    }
}
