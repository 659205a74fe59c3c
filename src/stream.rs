use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

const IO_BUFFER_SIZE: usize = 64 * 1024;

/// [`AsyncSeek`] narrowed to only allow seeking from the start.
pub trait AsyncSeekStart {
    /// Same semantics as [`AsyncSeek::start_seek`], always passing the
    /// position as the `SeekFrom::Start` variant.
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    /// Same semantics as [`AsyncSeek::poll_complete`], returning `()` instead
    /// of the new stream position.
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

/// Byte stream over a window of a seekable source.
///
/// Seeks to `start`, then yields up to `length` bytes in buffered chunks.
/// Implements [`Stream`], [`http_body::Body`] with an exact size hint, and
/// [`IntoResponse`]. An early end of the source simply ends the stream.
#[pin_project]
pub struct RangedStream<B> {
    state: StreamState,
    length: u64,
    #[pin]
    source: B,
}

impl<B> RangedStream<B> {
    pub fn new(source: B, start: u64, length: u64) -> Self {
        RangedStream {
            state: StreamState::Seek { start },
            length,
            source,
        }
    }
}

#[derive(Debug)]
enum StreamState {
    Seek { start: u64 },
    Seeking { remaining: u64 },
    Reading { buffer: BytesMut, remaining: u64 },
}

impl<B: AsyncRead + AsyncSeekStart + Send + 'static> IntoResponse for RangedStream<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: AsyncRead + AsyncSeekStart> Body for RangedStream<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<io::Result<Frame<Bytes>>>> {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: AsyncRead + AsyncSeekStart> Stream for RangedStream<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        let mut this = self.project();

        if let StreamState::Seek { start } = *this.state {
            match this.source.as_mut().start_seek(start) {
                Err(e) => return Poll::Ready(Some(Err(e))),
                Ok(()) => {
                    let remaining = *this.length;
                    *this.state = StreamState::Seeking { remaining };
                }
            }
        }

        if let StreamState::Seeking { remaining } = *this.state {
            match this.source.as_mut().poll_complete(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(Ok(())) => {
                    let buffer = allocate_buffer();
                    *this.state = StreamState::Reading { buffer, remaining };
                }
            }
        }

        if let StreamState::Reading { buffer, remaining } = this.state {
            let uninit = buffer.spare_capacity_mut();

            // never read past the end of the requested window
            let nbytes = std::cmp::min(
                uninit.len(),
                usize::try_from(*remaining).unwrap_or(usize::MAX),
            );

            let mut read_buf = ReadBuf::uninit(&mut uninit[0..nbytes]);

            match this.source.as_mut().poll_read(cx, &mut read_buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(Ok(())) => match read_buf.filled().len() {
                    0 => return Poll::Ready(None),
                    n => {
                        // SAFETY: poll_read has filled the buffer with `n`
                        // additional bytes. `buffer.len` should always be
                        // 0 here, but include it for rigorous correctness
                        unsafe {
                            buffer.set_len(buffer.len() + n);
                        }

                        // replace state buffer and take this one to return
                        let chunk = mem::replace(buffer, allocate_buffer());

                        // this usize->u64 conversion always succeeds: n is
                        // capped at remaining by the cmp::min above
                        *remaining -= u64::try_from(n).unwrap();

                        return Poll::Ready(Some(Ok(chunk.freeze())));
                    }
                },
            }
        }

        unreachable!();
    }
}

fn allocate_buffer() -> BytesMut {
    BytesMut::with_capacity(IO_BUFFER_SIZE)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use futures::{pin_mut, StreamExt};

    use super::*;

    async fn collect(stream: impl Stream<Item = io::Result<Bytes>>) -> Vec<u8> {
        let mut out = Vec::new();
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await.transpose().unwrap() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn yields_the_requested_window() {
        let stream = RangedStream::new(Cursor::new(b"0123456789".to_vec()), 2, 5);
        assert_eq!(collect(stream).await, b"23456".to_vec());
    }

    #[tokio::test]
    async fn yields_everything_from_the_start() {
        let stream = RangedStream::new(Cursor::new(b"0123456789".to_vec()), 0, 10);
        assert_eq!(collect(stream).await, b"0123456789".to_vec());
    }

    #[tokio::test]
    async fn stops_at_source_eof() {
        let stream = RangedStream::new(Cursor::new(b"0123".to_vec()), 2, 10);
        assert_eq!(collect(stream).await, b"23".to_vec());
    }

    #[tokio::test]
    async fn empty_window_yields_nothing() {
        let stream = RangedStream::new(Cursor::new(b"0123".to_vec()), 0, 0);
        assert_eq!(collect(stream).await, Vec::<u8>::new());
    }

    #[test]
    fn size_hint_is_exact() {
        let stream = RangedStream::new(Cursor::new(Vec::new()), 0, 7);
        assert_eq!(Body::size_hint(&stream).exact(), Some(7));
    }
}
