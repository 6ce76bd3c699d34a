use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Buf;
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use tracing::error;

use crate::BodyError;

pin_project! {
    /// Fails as soon as the decoded body grows past `limit` bytes.
    #[derive(Debug)]
    pub struct LimitedBody<B> {
        #[pin]
        inner: B,
        limit: Option<u64>,
        received: u64,
    }
}

impl<B> LimitedBody<B> {
    pub fn new(inner: B, limit: Option<u64>) -> Self {
        Self { inner, limit, received: 0 }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B> Body for LimitedBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<BodyError>,
{
    type Data = B::Data;
    type Error = BodyError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        let frame = match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
            None => return Poll::Ready(None),
        };

        if let Some(data) = frame.data_ref() {
            *this.received += data.remaining() as u64;

            if let Some(limit) = *this.limit
                && *this.received > limit
            {
                error!(limit, received = *this.received, "request body exceeded the size limit");
                return Poll::Ready(Some(Err(BodyError::SizeLimitExceeded { limit, received: *this.received })));
            }
        }

        Poll::Ready(Some(Ok(frame)))
    }
}
