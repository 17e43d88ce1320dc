//! Server-sent-event decoding.
//!
//! Bytes are buffered until a full line is available, so a chunk boundary
//! may fall anywhere, including inside a multi-byte character. Only `data:`
//! lines are surfaced; comments, `event:` and `id:` lines are ignored.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;

use super::ProviderError;

/// Incremental line splitter yielding SSE `data:` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the payloads of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line[..pos]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a final unterminated line.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    Some(payload.to_owned())
}

/// Stream adapter turning an HTTP byte stream into SSE `data:` payloads.
pub struct SseDataStream<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    queue: VecDeque<String>,
    finished: bool,
}

impl<S> SseDataStream<S> {
    /// Wrap a byte stream such as `reqwest::Response::bytes_stream()`.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
            decoder: SseDecoder::new(),
            queue: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S, B> Stream for SseDataStream<S>
where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
{
    type Item = Result<String, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(payload) = self.queue.pop_front() {
                return Poll::Ready(Some(Ok(payload)));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let payloads = self.decoder.push(chunk.as_ref());
                    self.queue.extend(payloads);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::Request(e))));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    if let Some(payload) = self.decoder.finish() {
                        self.queue.push_back(payload);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
