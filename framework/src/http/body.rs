//! Request body buffering and parsing utilities
//!
//! A request body starts out as a stream. Buffering collects it once, with a
//! size limit, into a [`BufferedBody`] that can be read many times through
//! `std::io::Read` and rewound with `std::io::Seek`.

use crate::error::FrameworkError;
use bytes::Bytes;
use bytes::BytesMut;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::io::{self, Read, Seek, SeekFrom};

/// Error type of a boxed streaming body
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Streaming body as received from the connection
pub type StreamingBody = BoxBody<Bytes, BoxError>;

/// The body of a [`Request`](super::Request)
pub enum RequestBody {
    /// Not read yet
    Streaming(StreamingBody),
    /// Collected in memory, re-readable
    Buffered(BufferedBody),
    /// Collecting failed; every later read reports the same error
    Failed(FrameworkError),
}

impl RequestBody {
    /// Box any `http_body::Body` into a streaming request body
    pub fn streaming<B>(body: B) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self::Streaming(body.map_err(Into::into).boxed())
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered(_))
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("RequestBody::Streaming"),
            Self::Buffered(body) => f.debug_tuple("RequestBody::Buffered").field(body).finish(),
            Self::Failed(err) => f.debug_tuple("RequestBody::Failed").field(err).finish(),
        }
    }
}

/// An in-memory request body with a read cursor
#[derive(Debug, Clone, Default)]
pub struct BufferedBody {
    bytes: Bytes,
    position: usize,
}

impl BufferedBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }

    /// The whole body, independent of the read position
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Move the read position back to the start
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Read for BufferedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.bytes[self.position.min(self.bytes.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Seek for BufferedBody {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => (self.bytes.len() as u64).checked_add_signed(delta),
            SeekFrom::Current(delta) => (self.position as u64).checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of body")
        })?;
        self.position = usize::try_from(target).unwrap_or(usize::MAX);
        Ok(target)
    }
}

/// Collect a streaming body, refusing more than `limit` bytes
///
/// A `Content-Length` above the limit is rejected before anything is read.
pub async fn collect_body(
    mut body: StreamingBody,
    content_length: Option<usize>,
    limit: usize,
) -> Result<Bytes, FrameworkError> {
    if content_length.is_some_and(|len| len > limit) {
        return Err(FrameworkError::payload_too_large(limit));
    }

    let mut collected = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| {
            FrameworkError::internal(format!("Failed to read request body: {}", e))
        })?;
        if let Ok(data) = frame.into_data() {
            if collected.len() + data.len() > limit {
                return Err(FrameworkError::payload_too_large(limit));
            }
            collected.extend_from_slice(&data);
        }
    }
    Ok(collected.freeze())
}

/// Parse bytes as JSON into the target type
pub fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, FrameworkError> {
    serde_json::from_slice(bytes)
        .map_err(|e| FrameworkError::internal(format!("Failed to parse JSON body: {}", e)))
}

/// Parse bytes as form-urlencoded into the target type
pub fn parse_form<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, FrameworkError> {
    serde_urlencoded::from_bytes(bytes)
        .map_err(|e| FrameworkError::internal(format!("Failed to parse form body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use pretty_assertions::assert_eq;

    fn streaming(bytes: impl Into<Bytes>) -> StreamingBody {
        Full::new(bytes.into()).map_err(Into::into).boxed()
    }

    /// A body that yields one data frame per chunk
    struct Chunks(std::collections::VecDeque<Bytes>);

    impl hyper::body::Body for Chunks {
        type Data = Bytes;
        type Error = std::convert::Infallible;

        fn poll_frame(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Result<hyper::body::Frame<Bytes>, Self::Error>>> {
            std::task::Poll::Ready(self.0.pop_front().map(|chunk| Ok(hyper::body::Frame::data(chunk))))
        }
    }

    fn chunked(chunks: &[&'static [u8]]) -> StreamingBody {
        Chunks(chunks.iter().copied().map(Bytes::from_static).collect())
            .map_err(Into::into)
            .boxed()
    }

    #[test]
    fn test_buffered_body_reads_and_rewinds() {
        let mut body = BufferedBody::new(&b"{\"a\":1}"[..]);

        let mut first = String::new();
        body.read_to_string(&mut first).unwrap();
        assert_eq!(first, "{\"a\":1}");
        assert_eq!(body.position(), 7);

        let mut exhausted = String::new();
        body.read_to_string(&mut exhausted).unwrap();
        assert_eq!(exhausted, "");

        body.rewind();
        let mut second = String::new();
        body.read_to_string(&mut second).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_buffered_body_seek() {
        let mut body = BufferedBody::new(&b"abcdef"[..]);
        assert_eq!(body.seek(SeekFrom::End(-2)).unwrap(), 4);

        let mut tail = String::new();
        body.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "ef");

        assert!(body.seek(SeekFrom::Current(-10)).is_err());
        assert_eq!(body.seek(SeekFrom::Start(0)).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collect_body_within_limit() {
        let bytes = collect_body(streaming(&b"hello"[..]), None, 10)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_collect_body_over_limit_without_content_length() {
        let err = collect_body(streaming(vec![0u8; 100]), None, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::PayloadTooLarge { limit: 10 }));
    }

    #[tokio::test]
    async fn test_collect_body_counts_every_frame() {
        let chunks = chunked(&[&b"abcd"[..], &b"efgh"[..], &b"ij"[..]]);
        let err = collect_body(chunks, None, 9).await.unwrap_err();
        assert!(matches!(err, FrameworkError::PayloadTooLarge { limit: 9 }));

        let chunks = chunked(&[&b"abcd"[..], &b"efgh"[..], &b"ij"[..]]);
        let bytes = collect_body(chunks, None, 10).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"abcdefghij"));
    }

    #[tokio::test]
    async fn test_collect_body_rejects_declared_length() {
        let err = collect_body(streaming(&b"x"[..]), Some(1000), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::PayloadTooLarge { limit: 10 }));
    }
}
