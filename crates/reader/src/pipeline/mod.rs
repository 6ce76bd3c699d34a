//! The content stream pipeline.
//!
//! A request body is read through a chain of [`http_body::Body`] adapters, each
//! pulling from the one before it:
//!
//! ```text
//! transport -> ClaimedBody -> DecodedBody -> LimitedBody -> collect_bytes
//! ```
//!
//! - [`ClaimedBody`] checks the raw byte count against `content-length`
//! - [`DecodedBody`] undoes the `content-encoding`
//! - [`LimitedBody`] caps the decoded size
//! - [`collect_bytes`] buffers the result
//!
//! Nothing is read ahead: a stage only polls its inner body when it is polled itself,
//! so a slow consumer slows the transport down. When any stage fails the chain is
//! dropped, taking the decompressor with it, and whatever the transport still holds
//! is read and discarded.

mod claim;
mod decoder;
mod limiter;
mod sink;

pub use claim::ClaimedBody;
pub use decoder::{ContentEncoding, DecodedBody, OUTPUT_FRAME_SIZE};
pub use limiter::LimitedBody;
pub use sink::collect_bytes;

use bytes::{Buf, Bytes};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::{info, trace};

use crate::{BodyError, BoxError};

/// Bounds checked while a body streams through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamLimits {
    /// The declared `content-length`; the raw byte count must match it exactly.
    pub expected_length: Option<u64>,
    /// Ceiling on the decoded byte count.
    pub size_limit: Option<u64>,
}

/// Reads `body` to the end through claim check, decoding and size limit.
///
/// On failure the remaining transport bytes are drained unless the transport itself
/// failed.
pub async fn read_raw<B>(body: B, encoding: ContentEncoding, limits: StreamLimits) -> Result<Bytes, BodyError>
where
    B: Body + Unpin,
    B::Data: Buf,
    B::Error: Into<BoxError>,
{
    let claimed = ClaimedBody::new(body, limits.expected_length);
    let mut chain = LimitedBody::new(DecodedBody::new(claimed, encoding), limits.size_limit);

    match collect_bytes(&mut chain).await {
        Ok(bytes) => {
            trace!(%encoding, size = bytes.len(), "read request body");
            Ok(bytes)
        }
        Err(e) => {
            let transport = chain.into_inner().into_inner().into_inner();
            if !matches!(e, BodyError::Transport { .. }) {
                skip_body(transport).await;
            }
            Err(e)
        }
    }
}

/// Reads and discards the rest of `body`, stopping quietly at the first error.
async fn skip_body<B>(mut body: B)
where
    B: Body + Unpin,
    B::Data: Buf,
{
    let mut size: usize = 0;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    size += data.remaining();
                }
            }
            Err(_) => {
                trace!(size, "skip request body stopped by transport error");
                break;
            }
        }
    }

    if size > 0 {
        info!(size = size, "skip request body");
    }
}
