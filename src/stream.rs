use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tokio::io::ReadBuf;

use crate::{ByteRange, FileTarget, KnownSize, RangeBody};

/// Upper bound on the size of every chunk a [`RangedStream`] yields, unless
/// configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Opens files and streams a byte window out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStreamer {
    chunk_size: usize,
}

impl Default for FileStreamer {
    fn default() -> Self {
        FileStreamer::new(DEFAULT_CHUNK_SIZE)
    }
}

impl FileStreamer {
    /// A zero chunk size is treated as one byte.
    pub fn new(chunk_size: usize) -> Self {
        FileStreamer { chunk_size: chunk_size.max(1) }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size as u64
    }

    /// Opens the target file and returns a stream over `range` of it. The
    /// size recorded at lookup is trusted; metadata is not read again.
    ///
    /// Nothing is read until the stream is first polled. The file is closed
    /// when the window has been delivered, on the first error, or when the
    /// stream is dropped, whichever comes first.
    pub async fn open(
        &self,
        target: &FileTarget,
        range: ByteRange,
    ) -> io::Result<RangedStream<KnownSize<tokio::fs::File>>> {
        let file = tokio::fs::File::open(&target.path).await?;
        let body = KnownSize::sized(file, target.size);
        Ok(RangedStream::with_chunk_size(body, range, self.chunk_size))
    }
}

/// Response body stream over one byte window. Implements [`Stream`] and [`Body`].
///
/// Chunks come out in file order, each exactly `chunk_size` bytes except for
/// the last one, and together cover the window with no gaps. Finite and not
/// restartable.
#[pin_project]
pub struct RangedStream<B> {
    state: StreamState,
    length: u64,
    chunk_size: usize,
    #[pin]
    body: Option<B>,
}

impl<B: RangeBody> RangedStream<B> {
    pub fn new(body: B, range: ByteRange) -> Self {
        RangedStream::with_chunk_size(body, range, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(body: B, range: ByteRange, chunk_size: usize) -> Self {
        let byte_size = body.byte_size();
        if range.end >= byte_size {
            tracing::debug!(
                start = range.start,
                end = range.end,
                byte_size,
                "window runs past the end of the body, stream will end early",
            );
        }

        RangedStream {
            state: StreamState::Seek { start: range.start },
            length: range.len(),
            chunk_size: chunk_size.max(1),
            body: Some(body),
        }
    }
}

impl<B> RangedStream<B> {
    /// Total number of bytes this stream yields when it runs to completion.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the underlying body has been released.
    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }
}

impl<B> std::fmt::Debug for RangedStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedStream")
            .field("state", &self.state)
            .field("length", &self.length)
            .field("chunk_size", &self.chunk_size)
            .field("closed", &self.body.is_none())
            .finish()
    }
}

#[derive(Debug)]
enum StreamState {
    Seek { start: u64 },
    Seeking { remaining: u64 },
    Reading { buffer: BytesMut, remaining: u64 },
    Done,
}

impl<B: RangeBody> Body for RangedStream<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }

    fn is_end_stream(&self) -> bool {
        self.body.is_none()
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<io::Result<Frame<Bytes>>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeBody> Stream for RangedStream<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>
    ) -> Poll<Option<io::Result<Bytes>>> {
        let mut this = self.project();

        let body = match this.body.as_mut().as_pin_mut() {
            Some(body) => body,
            None => return Poll::Ready(None),
        };

        let length = *this.length;
        let poll = poll_window(body, this.state, length, *this.chunk_size, cx);

        // release the handle as soon as nothing more will be read from it
        if let StreamState::Done = this.state {
            this.body.set(None);
        }

        poll
    }
}

fn poll_window<B: RangeBody>(
    mut body: Pin<&mut B>,
    state: &mut StreamState,
    length: u64,
    chunk_size: usize,
    cx: &mut Context<'_>,
) -> Poll<Option<io::Result<Bytes>>> {
    if let StreamState::Seek { start } = *state {
        match body.as_mut().start_seek(start) {
            Err(e) => { return fail(state, e); }
            Ok(()) => { *state = StreamState::Seeking { remaining: length }; }
        }
    }

    if let StreamState::Seeking { remaining } = *state {
        match body.as_mut().poll_complete(cx) {
            Poll::Pending => { return Poll::Pending; }
            Poll::Ready(Err(e)) => { return fail(state, e); }
            Poll::Ready(Ok(())) => {
                let buffer = BytesMut::with_capacity(chunk_len(chunk_size, remaining));
                *state = StreamState::Reading { buffer, remaining };
            }
        }
    }

    if let StreamState::Reading { buffer, remaining } = &mut *state {
        // the size of this chunk, the smaller of the chunk size and the
        // number of bytes remaining in the window
        let want = chunk_len(chunk_size, *remaining);
        buffer.reserve(want - buffer.len());

        // a chunk is only handed out once full, so short reads from the body
        // never leak into chunk boundaries
        while buffer.len() < want {
            let missing = want - buffer.len();
            let uninit = buffer.spare_capacity_mut();
            let nbytes = std::cmp::min(uninit.len(), missing);
            let mut read_buf = ReadBuf::uninit(&mut uninit[0..nbytes]);

            match body.as_mut().poll_read(cx, &mut read_buf) {
                Poll::Pending => { return Poll::Pending; }
                Poll::Ready(Err(e)) => { return fail(state, e); }
                Poll::Ready(Ok(())) => {
                    match read_buf.filled().len() {
                        0 => {
                            let e = io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "body ended before the requested range was complete",
                            );
                            return fail(state, e);
                        }
                        n => {
                            // SAFETY: poll_read has filled the first `n` bytes
                            // of the spare capacity, directly after the
                            // bytes already in the buffer
                            unsafe { buffer.set_len(buffer.len() + n); }
                        }
                    }
                }
            }
        }

        let chunk = buffer.split().freeze();

        // cannot underflow, chunk.len() == want <= remaining
        *remaining -= chunk.len() as u64;
        if *remaining == 0 {
            *state = StreamState::Done;
        }

        return Poll::Ready(Some(Ok(chunk)));
    }

    Poll::Ready(None)
}

fn fail(state: &mut StreamState, e: io::Error) -> Poll<Option<io::Result<Bytes>>> {
    tracing::warn!(error = %e, "aborting range stream");
    *state = StreamState::Done;
    Poll::Ready(Some(Err(e)))
}

fn chunk_len(chunk_size: usize, remaining: u64) -> usize {
    std::cmp::min(chunk_size, usize::try_from(remaining).unwrap_or(usize::MAX))
}
