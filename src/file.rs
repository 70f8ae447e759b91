use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

use crate::{AsyncSeekStart, RangeBody, ServeError};

/// A file on disk together with its size at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub path: PathBuf,
    pub size: u64,
}

impl FileTarget {
    /// Reads metadata for `path`. Anything that is not an existing regular
    /// file is [`ServeError::NotFound`].
    pub async fn lookup(path: impl Into<PathBuf>) -> Result<FileTarget, ServeError> {
        let path = path.into();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ServeError::NotFound),
            Err(e) => return Err(ServeError::Io(e)),
        };

        if !metadata.is_file() {
            return Err(ServeError::NotFound);
        }

        Ok(FileTarget { path, size: metadata.len() })
    }
}

/// Implements [`RangeBody`] for any [`AsyncRead`] and [`AsyncSeekStart`], constructed with a fixed byte size.
#[pin_project]
pub struct KnownSize<B: AsyncRead + AsyncSeekStart> {
    byte_size: u64,
    #[pin]
    body: B,
}

impl<B: AsyncRead + AsyncSeekStart> std::fmt::Debug for KnownSize<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownSize")
            .field("byte_size", &self.byte_size)
            .finish()
    }
}

impl<B: AsyncRead + AsyncSeekStart> KnownSize<B> {
    /// Construct a [`KnownSize`] instance with a byte size supplied manually.
    pub fn sized(body: B, byte_size: u64) -> Self {
        KnownSize { byte_size, body }
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncRead for KnownSize<B> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        this.body.poll_read(cx, buf)
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncSeekStart for KnownSize<B> {
    fn start_seek(
        self: Pin<&mut Self>,
        position: u64,
    ) -> io::Result<()> {
        let this = self.project();
        this.body.start_seek(position)
    }

    fn poll_complete(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        this.body.poll_complete(cx)
    }
}

impl<B: AsyncRead + AsyncSeekStart> RangeBody for KnownSize<B> {
    fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;
    use tokio::fs::File;
    use tokio::io::AsyncReadExt;

    use crate::{RangeBody, ServeError};

    use super::{FileTarget, KnownSize};

    #[tokio::test]
    async fn test_sized_file() {
        let target = FileTarget::lookup("test/fixture.txt").await.unwrap();
        let file = File::open(&target.path).await.unwrap();
        let known_size = KnownSize::sized(file, target.size);
        assert_eq!(54, known_size.byte_size());
    }

    #[tokio::test]
    async fn test_sized_reads_through() {
        let mut known_size = KnownSize::sized(Cursor::new(b"abcdef".to_vec()), 6);
        let mut contents = String::new();
        known_size.read_to_string(&mut contents).await.unwrap();
        assert_eq!("abcdef", contents);
    }

    #[tokio::test]
    async fn test_lookup() {
        let target = FileTarget::lookup("test/fixture.txt").await.unwrap();
        assert_eq!(54, target.size);
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        assert_matches!(FileTarget::lookup("test/no-such-file.pdf").await, Err(ServeError::NotFound));
    }

    #[tokio::test]
    async fn test_lookup_directory_is_not_found() {
        assert_matches!(FileTarget::lookup("test").await, Err(ServeError::NotFound));
    }
}
