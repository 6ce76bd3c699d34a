//! Content-encoding decompression of a request body.
//!
//! Supported codings are `gzip`, `deflate` (zlib wrapped), `br` and `identity`.
//! Every decompressor writes into a fixed buffer of [`OUTPUT_FRAME_SIZE`] bytes and
//! each filled buffer is handed downstream as one frame before more input is decoded,
//! so the size limiter sees the decoded bytes as they are produced. Compressed input
//! the decompressor could not take yet stays queued in the body.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll, ready};

use brotli::enc::StandardAlloc;
use brotli::{BrotliDecompressStream, BrotliResult, BrotliState};
use bytes::{Buf, Bytes, BytesMut};
use flate2::{Crc, Decompress, FlushDecompress, Status};
use http::HeaderValue;
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use tracing::{error, trace};

use crate::BodyError;

/// Largest data frame a decompressor emits.
pub const OUTPUT_FRAME_SIZE: usize = 32 * 1024;

/// A gzip header longer than this is rejected.
const MAX_GZIP_HEADER: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
}

impl ContentEncoding {
    /// Selects the coding named by a `content-encoding` header.
    ///
    /// A missing or blank header means `identity`. With `allow_decompression` off only
    /// `identity` is accepted.
    pub fn from_header(value: Option<&HeaderValue>, allow_decompression: bool) -> Result<Self, BodyError> {
        let Some(value) = value else {
            return Ok(ContentEncoding::Identity);
        };

        let Ok(token) = value.to_str() else {
            return Err(BodyError::encoding_unsupported(String::from_utf8_lossy(value.as_bytes())));
        };
        let encoding = token.parse::<ContentEncoding>()?;

        if !allow_decompression && encoding != ContentEncoding::Identity {
            return Err(BodyError::encoding_unsupported(encoding));
        }
        Ok(encoding)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
        }
    }
}

impl FromStr for ContentEncoding {
    type Err = BodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("identity") {
            Ok(ContentEncoding::Identity)
        } else if token.eq_ignore_ascii_case("gzip") {
            Ok(ContentEncoding::Gzip)
        } else if token.eq_ignore_ascii_case("deflate") {
            Ok(ContentEncoding::Deflate)
        } else if token.eq_ignore_ascii_case("br") {
            Ok(ContentEncoding::Brotli)
        } else {
            Err(BodyError::encoding_unsupported(token.to_ascii_lowercase()))
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn invalid_data(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Runs one inflate step, returning the bytes consumed, the bytes produced and
/// whether the deflate stream ended.
fn inflate(state: &mut Decompress, input: &[u8], output: &mut [u8]) -> io::Result<(usize, usize, bool)> {
    let (total_in, total_out) = (state.total_in(), state.total_out());
    let status = state.decompress(input, output, FlushDecompress::None).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let consumed = usize::try_from(state.total_in() - total_in).map_err(io::Error::other)?;
    let produced = usize::try_from(state.total_out() - total_out).map_err(io::Error::other)?;
    Ok((consumed, produced, status == Status::StreamEnd))
}

/// Length of the gzip member header at the start of `buf`, or `None` while it is
/// incomplete.
fn gzip_header_len(buf: &[u8]) -> io::Result<Option<usize>> {
    const FHCRC: u8 = 0x02;
    const FEXTRA: u8 = 0x04;
    const FNAME: u8 = 0x08;
    const FCOMMENT: u8 = 0x10;

    if buf.iter().zip([0x1f, 0x8b, 0x08]).any(|(byte, expected)| *byte != expected) {
        return Err(invalid_data("invalid gzip header"));
    }
    if buf.len() < 10 {
        return Ok(None);
    }

    let flags = buf[3];
    if flags & 0xe0 != 0 {
        return Err(invalid_data("reserved gzip header flags are set"));
    }

    let mut pos = 10;
    if flags & FEXTRA != 0 {
        let Some(len) = buf.get(pos..pos + 2) else {
            return Ok(None);
        };
        pos += 2 + usize::from(u16::from_le_bytes([len[0], len[1]]));
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            let Some(end) = buf.get(pos..).and_then(|rest| rest.iter().position(|b| *b == 0)) else {
                return Ok(None);
            };
            pos += end + 1;
        }
    }
    if flags & FHCRC != 0 {
        pos += 2;
    }

    Ok((buf.len() >= pos).then_some(pos))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GzipState {
    Header,
    Body,
    Trailer,
    Done,
}

/// A single member gzip decoder: header, raw deflate body, CRC32 and size trailer.
struct Gunzip {
    state: GzipState,
    inflate: Decompress,
    crc: Crc,
}

impl Gunzip {
    fn new() -> Self {
        Self { state: GzipState::Header, inflate: Decompress::new(false), crc: Crc::new() }
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> io::Result<(usize, usize)> {
        let mut consumed = 0;
        let mut produced = 0;

        if self.state == GzipState::Header {
            match gzip_header_len(input)? {
                Some(len) => {
                    consumed = len;
                    self.state = GzipState::Body;
                }
                None if input.len() > MAX_GZIP_HEADER => return Err(invalid_data("gzip header is too large")),
                None => return Ok((0, 0)),
            }
        }

        if self.state == GzipState::Body {
            let (read, written, ended) = inflate(&mut self.inflate, &input[consumed..], output)?;
            self.crc.update(&output[..written]);
            consumed += read;
            produced = written;

            if !ended {
                return Ok((consumed, produced));
            }
            self.state = GzipState::Trailer;
        }

        if self.state == GzipState::Trailer {
            let Some(trailer) = input.get(consumed..consumed + 8) else {
                return Ok((consumed, produced));
            };

            let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
            let size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
            if crc != self.crc.sum() || size != self.crc.amount() {
                return Err(invalid_data("gzip checksum mismatch"));
            }

            consumed += 8;
            self.state = GzipState::Done;
        }

        if consumed < input.len() {
            return Err(invalid_data("data after the end of the gzip stream"));
        }
        Ok((consumed, produced))
    }

    fn is_finished(&self) -> bool {
        self.state == GzipState::Done
    }
}

/// A zlib stream decoder.
struct Inflate {
    state: Decompress,
    ended: bool,
}

impl Inflate {
    fn new() -> Self {
        Self { state: Decompress::new(true), ended: false }
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> io::Result<(usize, usize)> {
        if self.ended {
            return if input.is_empty() { Ok((0, 0)) } else { Err(invalid_data("data after the end of the deflate stream")) };
        }

        let (consumed, produced, ended) = inflate(&mut self.state, input, output)?;
        self.ended = ended;
        Ok((consumed, produced))
    }
}

struct Unbrotli {
    state: BrotliState<StandardAlloc, StandardAlloc, StandardAlloc>,
    total_out: usize,
    ended: bool,
}

impl Unbrotli {
    fn new() -> Self {
        Self {
            state: BrotliState::new(StandardAlloc::default(), StandardAlloc::default(), StandardAlloc::default()),
            total_out: 0,
            ended: false,
        }
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> io::Result<(usize, usize)> {
        if self.ended {
            return if input.is_empty() { Ok((0, 0)) } else { Err(invalid_data("data after the end of the brotli stream")) };
        }

        let mut available_in = input.len();
        let mut consumed = 0;
        let mut available_out = output.len();
        let mut produced = 0;

        let result = BrotliDecompressStream(
            &mut available_in,
            &mut consumed,
            input,
            &mut available_out,
            &mut produced,
            output,
            &mut self.total_out,
            &mut self.state,
        );

        match result {
            BrotliResult::ResultSuccess => self.ended = true,
            BrotliResult::NeedsMoreInput | BrotliResult::NeedsMoreOutput => {}
            BrotliResult::ResultFailure => return Err(invalid_data("corrupt brotli stream")),
        }
        Ok((consumed, produced))
    }
}

enum Decoder {
    Gzip(Box<Gunzip>),
    Deflate(Box<Inflate>),
    Br(Box<Unbrotli>),
}

impl Decoder {
    fn new(encoding: ContentEncoding) -> Option<Self> {
        match encoding {
            ContentEncoding::Identity => None,
            ContentEncoding::Gzip => Some(Self::Gzip(Box::new(Gunzip::new()))),
            ContentEncoding::Deflate => Some(Self::Deflate(Box::new(Inflate::new()))),
            ContentEncoding::Brotli => Some(Self::Br(Box::new(Unbrotli::new()))),
        }
    }

    /// Decodes from `input` into `output`, returning the bytes consumed and produced.
    ///
    /// `(0, 0)` means the decoder needs more input before it can continue.
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> io::Result<(usize, usize)> {
        match self {
            Self::Gzip(decoder) => decoder.decode(input, output),
            Self::Deflate(decoder) => decoder.decode(input, output),
            Self::Br(decoder) => decoder.decode(input, output),
        }
    }

    /// Checks the compressed stream reached its end.
    fn finish(&self) -> io::Result<()> {
        let finished = match self {
            Self::Gzip(decoder) => decoder.is_finished(),
            Self::Deflate(decoder) => decoder.ended,
            Self::Br(decoder) => decoder.ended,
        };

        if finished { Ok(()) } else { Err(io::Error::new(io::ErrorKind::UnexpectedEof, "compressed stream is truncated")) }
    }
}

pin_project! {
    /// Decompresses the data frames of the inner body.
    pub struct DecodedBody<B: Body> {
        #[pin]
        inner: B,
        encoding: ContentEncoding,
        decoder: Option<Decoder>,
        pending: Bytes,
        more_output: bool,
        finished: bool,
    }
}

impl<B: Body> DecodedBody<B> {
    pub fn new(inner: B, encoding: ContentEncoding) -> Self {
        Self { inner, encoding, decoder: Decoder::new(encoding), pending: Bytes::new(), more_output: false, finished: false }
    }

    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    /// Drops the decompressor and returns the inner body.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: Body> fmt::Debug for DecodedBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBody")
            .field("encoding", &self.encoding)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<B> Body for DecodedBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<BodyError>,
{
    type Data = Bytes;
    type Error = BodyError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();

        loop {
            if let Some(decoder) = this.decoder.as_mut()
                && (!this.pending.is_empty() || *this.more_output)
            {
                let mut output = BytesMut::zeroed(OUTPUT_FRAME_SIZE);
                let (consumed, produced) = match decoder.decode(this.pending, &mut output) {
                    Ok(progress) => progress,
                    Err(e) => {
                        error!(encoding = %this.encoding, cause = %e, "decode request body error");
                        return Poll::Ready(Some(Err(BodyError::content_decode(this.encoding.name(), e))));
                    }
                };

                this.pending.advance(consumed);
                *this.more_output = produced == OUTPUT_FRAME_SIZE;
                trace!(encoding = %this.encoding, consumed, produced, "decoded body data");

                if produced > 0 {
                    output.truncate(produced);
                    return Poll::Ready(Some(Ok(Frame::data(output.freeze()))));
                }
                if consumed > 0 {
                    continue;
                }
            }

            if *this.finished {
                let Some(decoder) = this.decoder.take() else {
                    return Poll::Ready(None);
                };

                return match decoder.finish() {
                    Ok(()) => Poll::Ready(None),
                    Err(e) => {
                        error!(encoding = %this.encoding, cause = %e, "finish decoding request body error");
                        Poll::Ready(Some(Err(BodyError::content_decode(this.encoding.name(), e))))
                    }
                };
            }

            match ready!(this.inner.as_mut().poll_frame(cx)) {
                Some(Ok(frame)) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    match frame.into_data() {
                        Ok(data) if this.decoder.is_some() => {
                            if this.pending.is_empty() {
                                *this.pending = data;
                            } else {
                                let mut joined = BytesMut::with_capacity(this.pending.len() + data.len());
                                joined.extend_from_slice(this.pending);
                                joined.extend_from_slice(&data);
                                *this.pending = joined.freeze();
                            }
                        }
                        Ok(data) => return Poll::Ready(Some(Ok(Frame::data(data)))),
                        Err(trailers) => return Poll::Ready(Some(Ok(trailers))),
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
                None => *this.finished = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::io::Write;

    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::{Compression, GzBuilder};
    use futures::stream;
    use http_body_util::{BodyExt, Full, StreamBody};

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn brotli(data: &[u8]) -> Vec<u8> {
        let mut encoder = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
        encoder.write_all(data).unwrap();
        encoder.into_inner()
    }

    /// A body that yields `data` in chunks of `size` bytes.
    fn chunked(data: &[u8], size: usize) -> StreamBody<stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, BodyError>>>> {
        let frames: Vec<Result<Frame<Bytes>, BodyError>> =
            data.chunks(size).map(|chunk| Ok(Frame::data(Bytes::copy_from_slice(chunk)))).collect();
        StreamBody::new(stream::iter(frames))
    }

    async fn decode(data: Vec<u8>, encoding: ContentEncoding) -> Result<Bytes, BodyError> {
        let body = Full::new(Bytes::from(data)).map_err(|e: Infallible| -> BodyError { match e {} });
        Ok(DecodedBody::new(body, encoding).collect().await?.to_bytes())
    }

    #[test]
    fn select_encoding() {
        assert_eq!(ContentEncoding::from_header(None, true).unwrap(), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_header(Some(&HeaderValue::from_static("")), false).unwrap(), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_header(Some(&HeaderValue::from_static("GZip ")), true).unwrap(), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_header(Some(&HeaderValue::from_static("deflate")), true).unwrap(), ContentEncoding::Deflate);
        assert_eq!(ContentEncoding::from_header(Some(&HeaderValue::from_static("br")), true).unwrap(), ContentEncoding::Brotli);
        assert_eq!(ContentEncoding::from_header(Some(&HeaderValue::from_static("identity")), false).unwrap(), ContentEncoding::Identity);
    }

    #[test]
    fn reject_encoding() {
        for value in ["foobar", "gzip, br", "zstd", "x-gzip"] {
            let error = ContentEncoding::from_header(Some(&HeaderValue::from_static(value)), true).unwrap_err();
            assert!(matches!(error, BodyError::EncodingUnsupported { .. }), "{value}");
        }

        let error = ContentEncoding::from_header(Some(&HeaderValue::from_static("gzip")), false).unwrap_err();
        assert!(matches!(error, BodyError::EncodingUnsupported { encoding } if encoding == "gzip"));
    }

    #[tokio::test]
    async fn identity_passes_through() {
        let bytes = decode(b"plain".to_vec(), ContentEncoding::Identity).await.unwrap();
        assert_eq!(&bytes[..], b"plain");
    }

    #[tokio::test]
    async fn decode_each_coding() {
        let data = br#"{"a":1}"#;
        assert_eq!(&decode(gzip(data), ContentEncoding::Gzip).await.unwrap()[..], data);
        assert_eq!(&decode(zlib(data), ContentEncoding::Deflate).await.unwrap()[..], data);
        assert_eq!(&decode(brotli(data), ContentEncoding::Brotli).await.unwrap()[..], data);
    }

    #[tokio::test]
    async fn decode_across_small_chunks() {
        let data: Vec<u8> = (0..20_000u32).flat_map(|i| i.to_le_bytes()).collect();

        for (compressed, encoding) in
            [(gzip(&data), ContentEncoding::Gzip), (zlib(&data), ContentEncoding::Deflate), (brotli(&data), ContentEncoding::Brotli)]
        {
            let body = DecodedBody::new(chunked(&compressed, 7), encoding);
            let bytes = body.collect().await.unwrap().to_bytes();
            assert_eq!(bytes.len(), data.len(), "{encoding}");
            assert_eq!(&bytes[..], &data[..], "{encoding}");
        }
    }

    async fn frame_sizes(mut body: DecodedBody<impl Body<Data = Bytes, Error = BodyError> + Unpin>) -> Vec<usize> {
        let mut sizes = Vec::new();
        while let Some(frame) = body.frame().await {
            sizes.push(frame.unwrap().into_data().unwrap().len());
        }
        sizes
    }

    #[tokio::test]
    async fn frames_stay_within_output_size() {
        let data = vec![0_u8; 2 * 1024 * 1024];

        for (compressed, encoding) in
            [(gzip(&data), ContentEncoding::Gzip), (zlib(&data), ContentEncoding::Deflate), (brotli(&data), ContentEncoding::Brotli)]
        {
            let sizes = frame_sizes(DecodedBody::new(chunked(&compressed, compressed.len()), encoding)).await;

            assert_eq!(sizes.iter().sum::<usize>(), data.len(), "{encoding}");
            assert!(sizes.iter().all(|size| *size <= OUTPUT_FRAME_SIZE), "{encoding}: {:?}", sizes.iter().max());
        }
    }

    #[tokio::test]
    async fn large_noise_frame() {
        // xorshift noise barely compresses
        let mut seed = 0x2545_f491_u32;
        let data: Vec<u8> = (0..256 * 1024)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed.to_le_bytes()[0]
            })
            .collect();
        let compressed = gzip(&data);

        let sizes = frame_sizes(DecodedBody::new(chunked(&compressed, compressed.len()), ContentEncoding::Gzip)).await;
        assert_eq!(sizes.iter().sum::<usize>(), data.len());
        assert!(sizes.len() >= data.len() / OUTPUT_FRAME_SIZE);
        assert!(sizes.iter().all(|size| *size <= OUTPUT_FRAME_SIZE));
    }

    #[tokio::test]
    async fn gzip_optional_header_fields() {
        let data = br#"{"name":"micro-body"}"#;
        let mut encoder = GzBuilder::new()
            .extra(vec![b'x'; 300])
            .filename("payload.json")
            .comment("request body")
            .write(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let body = DecodedBody::new(chunked(&compressed, 1), ContentEncoding::Gzip);
        assert_eq!(&body.collect().await.unwrap().to_bytes()[..], data);
    }

    #[tokio::test]
    async fn gzip_checksum_mismatch() {
        let mut compressed = gzip(b"checked by crc32");
        let crc_start = compressed.len() - 8;
        compressed[crc_start] ^= 0xff;

        let error = decode(compressed, ContentEncoding::Gzip).await.unwrap_err();
        assert!(matches!(error, BodyError::ContentDecode { encoding: "gzip", .. }));
    }

    #[tokio::test]
    async fn data_after_the_stream_fails() {
        for (mut compressed, encoding) in
            [(gzip(b"abc"), ContentEncoding::Gzip), (zlib(b"abc"), ContentEncoding::Deflate), (brotli(b"abc"), ContentEncoding::Brotli)]
        {
            compressed.extend_from_slice(b"trailing garbage");
            let error = decode(compressed, encoding).await.unwrap_err();
            assert!(matches!(error, BodyError::ContentDecode { .. }), "{encoding}");
        }
    }

    #[tokio::test]
    async fn corrupt_input_fails() {
        for encoding in [ContentEncoding::Gzip, ContentEncoding::Deflate, ContentEncoding::Brotli] {
            let error = decode(b"definitely not compressed".to_vec(), encoding).await.unwrap_err();
            assert!(matches!(error, BodyError::ContentDecode { .. }), "{encoding}");
        }
    }

    #[tokio::test]
    async fn truncated_input_fails() {
        let data = b"some text that gets compressed and then cut short".repeat(10);

        for (mut compressed, encoding) in
            [(gzip(&data), ContentEncoding::Gzip), (zlib(&data), ContentEncoding::Deflate), (brotli(&data), ContentEncoding::Brotli)]
        {
            compressed.truncate(compressed.len() - 4);
            let error = decode(compressed, encoding).await.unwrap_err();
            assert!(matches!(error, BodyError::ContentDecode { .. }), "{encoding}");
        }
    }

    #[tokio::test]
    async fn inner_error_is_forwarded() {
        let frames: Vec<Result<Frame<Bytes>, BodyError>> = vec![Err(BodyError::transport("reset"))];
        let body = DecodedBody::new(StreamBody::new(stream::iter(frames)), ContentEncoding::Gzip);

        assert!(matches!(body.collect().await.unwrap_err(), BodyError::Transport { .. }));
    }
}
