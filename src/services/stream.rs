//! Stream translation
//!
//! Reads an upstream server-sent-event body line by line and forwards each
//! usable chunk to the client as it arrives.

use crate::models::openai::UpstreamStreamChunk;
use crate::services::converter::ApiConverter;
use crate::telemetry::Telemetry;
use async_trait::async_trait;
use axum::response::sse::Event;
use std::convert::Infallible;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Prefix of every upstream frame
pub const FRAME_PREFIX: &str = "data: ";

/// Terminal frame payload
pub const DONE_SENTINEL: &str = "[DONE]";

/// The receiving side of the stream has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination of client-protocol frames
///
/// Each call writes one `data: <payload>` frame and flushes it.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, payload: String) -> Result<(), SinkClosed>;

    /// Resolves once the client can no longer receive frames
    async fn wait_closed(&self);
}

#[async_trait]
impl FrameSink for mpsc::Sender<Result<Event, Infallible>> {
    async fn send_frame(&mut self, payload: String) -> Result<(), SinkClosed> {
        self.send(Ok(Event::default().data(payload)))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn wait_closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// Classification of one upstream line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Blank line, comment or other non-data line
    Ignored,
    /// End-of-stream sentinel
    Done,
    /// Chunk document to decode
    Payload(&'a str),
}

/// Classify one raw upstream line
pub fn parse_frame(line: &str) -> Frame<'_> {
    let line = line.trim();
    match line.strip_prefix(FRAME_PREFIX) {
        Some(DONE_SENTINEL) => Frame::Done,
        Some(payload) => Frame::Payload(payload),
        None => Frame::Ignored,
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Sentinel received and forwarded
    Completed,
    /// Upstream closed without a sentinel
    UpstreamClosed,
    /// Reading the upstream failed; no sentinel was written
    TransportError,
    /// The client went away
    ClientDisconnected,
}

impl StreamOutcome {
    pub fn is_error(self) -> bool {
        matches!(self, StreamOutcome::TransportError)
    }
}

/// Result of one streaming exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub outcome: StreamOutcome,
    /// Events written to the client, sentinel excluded
    pub chunks_forwarded: u64,
    /// Frames that failed to decode
    pub malformed_frames: u64,
}

/// Per-request stream translator
#[derive(Debug, Clone)]
pub struct StreamTranslator {
    converter: ApiConverter,
    telemetry: Telemetry,
    request_id: String,
}

impl StreamTranslator {
    pub fn new(converter: ApiConverter, telemetry: Telemetry, request_id: impl Into<String>) -> Self {
        Self {
            converter,
            telemetry,
            request_id: request_id.into(),
        }
    }

    /// Forward `upstream` to `sink` until the sentinel, end of input, a
    /// transport failure or a client disconnect
    pub async fn run<R, S>(&self, mut upstream: R, sink: &mut S) -> StreamSummary
    where
        R: AsyncBufRead + Unpin + Send,
        S: FrameSink,
    {
        let mut summary = StreamSummary {
            outcome: StreamOutcome::UpstreamClosed,
            chunks_forwarded: 0,
            malformed_frames: 0,
        };
        let mut buf = Vec::new();

        loop {
            buf.clear();

            let read = tokio::select! {
                biased;
                _ = sink.wait_closed() => {
                    debug!("Client disconnected, stopping upstream read");
                    summary.outcome = StreamOutcome::ClientDisconnected;
                    return summary;
                }
                read = upstream.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    debug!("Upstream stream closed");
                    summary.outcome = StreamOutcome::UpstreamClosed;
                    return summary;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading stream: {}", e);
                    self.telemetry
                        .record_error(&self.request_id, "stream_read_error", &format!("Error reading stream: {}", e))
                        .await;
                    summary.outcome = StreamOutcome::TransportError;
                    return summary;
                }
            }

            let line = String::from_utf8_lossy(&buf);
            let payload = match parse_frame(&line) {
                Frame::Ignored => continue,
                Frame::Done => {
                    summary.outcome = match sink.send_frame(DONE_SENTINEL.to_string()).await {
                        Ok(()) => StreamOutcome::Completed,
                        Err(SinkClosed) => StreamOutcome::ClientDisconnected,
                    };
                    return summary;
                }
                Frame::Payload(payload) => payload,
            };

            let chunk: UpstreamStreamChunk = match serde_json::from_str(payload) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Error parsing stream data: {}", e);
                    summary.malformed_frames += 1;
                    self.telemetry
                        .record_error(&self.request_id, "stream_parse_error", &format!("Error parsing stream data: {}", e))
                        .await;
                    continue;
                }
            };

            let event = match self.converter.convert_stream_chunk(&chunk) {
                Some(event) => event,
                None => continue,
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Error encoding stream response: {}", e);
                    self.telemetry
                        .record_error(&self.request_id, "stream_write_error", &format!("Error encoding stream response: {}", e))
                        .await;
                    continue;
                }
            };

            if sink.send_frame(json).await.is_err() {
                debug!("Client disconnected");
                summary.outcome = StreamOutcome::ClientDisconnected;
                return summary;
            }

            summary.chunks_forwarded += 1;
            self.telemetry
                .record_stream_chunk(&self.request_id, event.delta.text.len(), summary.chunks_forwarded)
                .await;
        }
    }
}
