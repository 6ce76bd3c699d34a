use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Buf;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use tracing::error;

use crate::{BodyError, BoxError};

pin_project! {
    /// Checks the raw transport bytes against the declared `content-length`.
    ///
    /// This is the stage that polls the transport, so transport failures become
    /// [`BodyError::Transport`] here and travel unchanged through the later stages.
    #[derive(Debug)]
    pub struct ClaimedBody<B> {
        #[pin]
        inner: B,
        expected: Option<u64>,
        received: u64,
    }
}

impl<B> ClaimedBody<B> {
    pub fn new(inner: B, expected: Option<u64>) -> Self {
        Self { inner, expected, received: 0 }
    }

    /// Bytes received from the transport so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B> Body for ClaimedBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<BoxError>,
{
    type Data = B::Data;
    type Error = BodyError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    *this.received += data.remaining() as u64;

                    if let Some(expected) = *this.expected
                        && *this.received > expected
                    {
                        error!(expected, received = *this.received, "request body exceeded its content-length");
                        return Poll::Ready(Some(Err(BodyError::ContentLengthExceeded { expected, received: *this.received })));
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(BodyError::transport(e)))),
            None => match *this.expected {
                Some(expected) if *this.received != expected => {
                    error!(expected, received = *this.received, "request body ended before its content-length");
                    Poll::Ready(Some(Err(BodyError::ContentLengthMismatch { expected, received: *this.received })))
                }
                _ => Poll::Ready(None),
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self.expected {
            Some(expected) => SizeHint::with_exact(expected.saturating_sub(self.received)),
            None => self.inner.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use futures::stream;
    use http_body_util::{BodyExt, Full, StreamBody};

    use super::*;

    fn chunked(chunks: &[&'static [u8]]) -> StreamBody<stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, io::Error>>>> {
        let frames: Vec<Result<Frame<Bytes>, io::Error>> =
            chunks.iter().map(|chunk| Ok(Frame::data(Bytes::from_static(chunk)))).collect();
        StreamBody::new(stream::iter(frames))
    }

    #[tokio::test]
    async fn matching_claim() {
        let body = ClaimedBody::new(chunked(&[b"hello", b" world"]), Some(11));
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn no_claim_is_transparent() {
        let body = ClaimedBody::new(Full::new(Bytes::from_static(b"anything")), None);
        assert_eq!(body.collect().await.unwrap().to_bytes().len(), 8);
    }

    #[tokio::test]
    async fn exceeds_claim_at_crossing_chunk() {
        let mut body = ClaimedBody::new(chunked(&[b"1234", b"5678", b"9"]), Some(6));

        assert!(body.frame().await.unwrap().is_ok());
        let error = body.frame().await.unwrap().unwrap_err();
        assert!(matches!(error, BodyError::ContentLengthExceeded { expected: 6, received: 8 }));
    }

    #[tokio::test]
    async fn short_body_mismatches_claim() {
        let body = ClaimedBody::new(chunked(&[b"1234"]), Some(10));
        let error = body.collect().await.unwrap_err();
        assert!(matches!(error, BodyError::ContentLengthMismatch { expected: 10, received: 4 }));
    }

    #[tokio::test]
    async fn transport_error_is_wrapped() {
        let frames: Vec<Result<Frame<Bytes>, io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(b"12"))), Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))];
        let body = ClaimedBody::new(StreamBody::new(stream::iter(frames)), Some(10));

        let error = body.collect().await.unwrap_err();
        assert!(matches!(error, BodyError::Transport { .. }));
    }
}
