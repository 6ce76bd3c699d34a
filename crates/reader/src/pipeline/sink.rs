use bytes::{Buf, BufMut, Bytes, BytesMut};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::trace;

use crate::BodyError;

/// Buffers every data frame of `body` into one contiguous [`Bytes`].
///
/// Trailers are ignored. A body that arrives as a single frame is returned without
/// copying.
pub async fn collect_bytes<B>(body: &mut B) -> Result<Bytes, BodyError>
where
    B: Body + Unpin,
    B::Data: Buf,
    B::Error: Into<BodyError>,
{
    let mut first: Option<Bytes> = None;
    let mut buf = BytesMut::new();
    let mut chunks = 0_usize;

    while let Some(frame) = body.frame().await {
        let Ok(mut data) = frame.map_err(Into::<BodyError>::into)?.into_data() else {
            continue;
        };
        chunks += 1;

        if chunks == 1 {
            first = Some(data.copy_to_bytes(data.remaining()));
            continue;
        }

        if let Some(first) = first.take() {
            buf.reserve(first.len() + data.remaining());
            buf.extend_from_slice(&first);
        }
        buf.put(data);
    }

    let bytes = first.unwrap_or_else(|| buf.freeze());

    trace!(chunks, size = bytes.len(), "collected request body");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures::stream;
    use http_body::Frame;
    use http_body_util::{Empty, Full, StreamBody};

    use super::*;

    #[tokio::test]
    async fn single_frame_is_not_copied() {
        let data = Bytes::from_static(b"single frame");
        let mut body = Full::new(data.clone()).map_err(|e: Infallible| -> BodyError { match e {} });

        let bytes = collect_bytes(&mut body).await.unwrap();
        assert_eq!(bytes, data);
        assert_eq!(bytes.as_ptr(), data.as_ptr());
    }

    #[tokio::test]
    async fn frames_are_joined_and_trailers_skipped() {
        let frames: Vec<Result<Frame<Bytes>, BodyError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"a"))),
            Ok(Frame::data(Bytes::from_static(b"bc"))),
            Ok(Frame::trailers(http::HeaderMap::new())),
            Ok(Frame::data(Bytes::from_static(b"def"))),
        ];
        let mut body = StreamBody::new(stream::iter(frames));

        assert_eq!(&collect_bytes(&mut body).await.unwrap()[..], b"abcdef");
    }

    #[tokio::test]
    async fn empty_body() {
        let mut body = Empty::<Bytes>::new().map_err(|e: Infallible| -> BodyError { match e {} });
        assert!(collect_bytes(&mut body).await.unwrap().is_empty());
    }
}
