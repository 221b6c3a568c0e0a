//! Runs one submission against the backend and reports progress as [`DispatchEvent`]s.

use crate::client::{ChatClient, ChatRequest};
use crate::error::DispatchError;
use crate::events::DispatchEvent;
use crate::streaming::Utf8StreamDecoder;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How the reply is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Buffered,
    Streaming,
}

impl DispatchMode {
    pub fn from_streaming(streaming_enabled: bool) -> Self {
        if streaming_enabled {
            DispatchMode::Streaming
        } else {
            DispatchMode::Buffered
        }
    }
}

/// An accepted user turn waiting to be sent
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: ChatRequest,
    pub mode: DispatchMode,
}

/// Handle to a dispatch running on the runtime
pub struct InFlight {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl InFlight {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait until the task has reported its final event
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "Dispatch task panicked");
        }
    }
}

/// Spawn the dispatch; a `Finished` event is always sent last
pub fn spawn_dispatch(
    client: ChatClient,
    submission: Submission,
    events: mpsc::UnboundedSender<DispatchEvent>,
) -> InFlight {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let outcome = dispatch(&client, submission, &events, &token).await;
        let _ = events.send(DispatchEvent::Finished(outcome));
    });

    InFlight { cancel, handle }
}

/// Send one request and resolve to the full reply text
pub async fn dispatch(
    client: &ChatClient,
    submission: Submission,
    events: &mpsc::UnboundedSender<DispatchEvent>,
    cancel: &CancellationToken,
) -> Result<String, DispatchError> {
    let Submission { request, mode } = submission;
    tracing::info!(
        ?mode,
        history = request.history.len(),
        attachment = request.attachment.is_some(),
        "Dispatching chat request"
    );

    let outcome = match mode {
        DispatchMode::Buffered => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(DispatchError::Cancelled),
                reply = client.chat(&request) => reply,
            }
        }
        DispatchMode::Streaming => {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(DispatchError::Cancelled),
                response = client.open_stream(&request) => response,
            };

            match opened {
                Ok(response) => {
                    let _ = events.send(DispatchEvent::StreamOpened);
                    consume_stream(response.bytes_stream(), events, cancel).await
                }
                Err(err) => Err(err),
            }
        }
    };

    match &outcome {
        Ok(text) => tracing::info!(?mode, chars = text.chars().count(), "Chat request finished"),
        Err(err) => tracing::error!(?mode, error = %err, "Chat request failed"),
    }

    outcome
}

/// Decode a byte stream chunk by chunk, forwarding each piece of text as it arrives
pub async fn consume_stream<S, E>(
    stream: S,
    events: &mpsc::UnboundedSender<DispatchEvent>,
    cancel: &CancellationToken,
) -> Result<String, DispatchError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    futures::pin_mut!(stream);
    let mut decoder = Utf8StreamDecoder::new();
    let mut reply = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                let text = decoder.decode(&bytes);
                tracing::debug!(bytes = bytes.len(), chars = text.chars().count(), "Stream chunk");
                forward(&mut reply, text, events);
            }
            Some(Err(err)) => return Err(DispatchError::Network(err.to_string())),
            None => break,
        }
    }

    forward(&mut reply, decoder.finish(), events);
    Ok(reply)
}

fn forward(reply: &mut String, text: String, events: &mpsc::UnboundedSender<DispatchEvent>) {
    if text.is_empty() {
        return;
    }
    reply.push_str(&text);
    let _ = events.send(DispatchEvent::Chunk(text));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, String>> {
        futures::stream::iter(parts.into_iter().map(|part| Ok(Bytes::from_static(part))))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DispatchEvent>) -> Vec<DispatchEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test]
    async fn stream_forwards_each_chunk_and_returns_the_whole_reply() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let reply = consume_stream(chunks(vec![b"he".as_slice(), b"llo".as_slice()]), &tx, &cancel)
            .await
            .unwrap();

        assert_eq!(reply, "hello");
        assert_eq!(
            drain(&mut rx),
            vec![
                DispatchEvent::Chunk("he".to_string()),
                DispatchEvent::Chunk("llo".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn stream_reassembles_split_characters() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let parts = vec![b"caf\xC3".as_slice(), b"\xA9!".as_slice()];
        let reply = consume_stream(chunks(parts), &tx, &cancel).await.unwrap();

        assert_eq!(reply, "café!");
        assert_eq!(
            drain(&mut rx),
            vec![
                DispatchEvent::Chunk("caf".to_string()),
                DispatchEvent::Chunk("é!".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_mid_body_is_a_network_failure() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let broken = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err("connection reset".to_string()),
        ]);

        let outcome = consume_stream(broken, &tx, &cancel).await;
        assert_eq!(
            outcome,
            Err(DispatchError::Network("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn cancelled_stream_stops_reading() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = consume_stream(chunks(vec![b"never".as_slice()]), &tx, &cancel).await;
        assert_eq!(outcome, Err(DispatchError::Cancelled));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn spawned_dispatch_reports_failure_as_final_event() {
        let client = ChatClient::new("http://127.0.0.1:1").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let submission = Submission {
            request: ChatRequest {
                text: "hi".to_string(),
                history: Vec::new(),
                attachment: None,
            },
            mode: DispatchMode::Buffered,
        };

        let in_flight = spawn_dispatch(client, submission, tx);
        let event = rx.recv().await.unwrap();
        in_flight.shutdown().await;

        assert!(matches!(
            event,
            DispatchEvent::Finished(Err(DispatchError::Network(_)))
        ));
    }

    #[test]
    fn mode_follows_preference() {
        assert_eq!(DispatchMode::from_streaming(true), DispatchMode::Streaming);
        assert_eq!(DispatchMode::from_streaming(false), DispatchMode::Buffered);
    }
}
