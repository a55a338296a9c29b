//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Streaming chat completions arrive as Server-Sent Events: each `data:`
//! line carries a JSON chunk whose `choices[0].delta.content` holds the next
//! piece of text, and `data: [DONE]` ends the reply. Frames that are not
//! valid UTF-8, not valid JSON, or carry no text are skipped.

use futures_util::{Stream, StreamExt};
use eventsource_stream::{EventStreamError, Eventsource};

use chatrelay_core::llm::provider::CompletionStream;
use chatrelay_types::llm::{LlmError, StreamEvent};

use super::status_error;
use super::types::{ChatCompletionBody, ChatCompletionChunk};

/// What one SSE `data` payload means for the reply.
#[derive(Debug, PartialEq, Eq)]
pub enum SseData {
    /// The `[DONE]` end marker.
    Done,
    /// A non-empty text fragment.
    Delta(String),
    /// Keep-alives, role-only deltas and anything unparseable.
    Skip,
}

/// Interpret the `data` field of one SSE event.
pub fn parse_sse_data(data: &str) -> SseData {
    let data = data.trim();
    if data == "[DONE]" {
        return SseData::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map(SseData::Delta)
            .unwrap_or(SseData::Skip),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed SSE payload");
            SseData::Skip
        }
    }
}

/// Map a raw SSE byte stream to [`StreamEvent`]s.
///
/// Emits one `TextDelta` per non-empty content fragment and a final `Done`,
/// whether the provider sent `[DONE]` or simply closed the stream. A
/// transport error ends the stream with [`LlmError::Stream`].
pub fn map_sse_stream<S, B, E>(bytes: S) -> CompletionStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut events = std::pin::pin!(bytes.eventsource());

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    Err(LlmError::Stream(e.to_string()))?;
                    unreachable!()
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable SSE frame");
                    continue;
                }
            };

            match parse_sse_data(&event.data) {
                SseData::Done => break,
                SseData::Delta(text) => yield StreamEvent::TextDelta { text },
                SseData::Skip => {}
            }
        }

        yield StreamEvent::Done;
    })
}

/// Open a streaming chat completion against `url`.
///
/// The request is sent when the returned stream is first polled. A non-2xx
/// status becomes the stream's only item; otherwise `Connected` is emitted
/// before the mapped SSE events.
pub fn create_openai_stream(
    client: &reqwest::Client,
    url: &str,
    body: ChatCompletionBody,
    api_key: Option<&secrecy::SecretString>,
) -> CompletionStream {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.map(|key| secrecy::ExposeSecret::expose_secret(key).to_string());

    Box::pin(async_stream::try_stream! {
        let mut request = client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body);
        if let Some(key) = &api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status();
        let response = if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Provider stream error response");
            Err(status_error(status, error_body))?;
            unreachable!()
        } else {
            response
        };

        yield StreamEvent::Connected;

        let mut events = map_sse_stream(response.bytes_stream());
        while let Some(event) = events.next().await {
            yield event?;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures_util::stream;

    use super::*;

    async fn collect(stream: CompletionStream) -> Vec<Result<StreamEvent, String>> {
        stream
            .map(|item| item.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    fn delta(text: &str) -> Result<StreamEvent, String> {
        Ok(StreamEvent::TextDelta {
            text: text.to_string(),
        })
    }

    #[test]
    fn test_parse_done_marker() {
        assert_eq!(parse_sse_data("[DONE]"), SseData::Done);
        assert_eq!(parse_sse_data(" [DONE] "), SseData::Done);
    }

    #[test]
    fn test_parse_content_delta() {
        assert_eq!(
            parse_sse_data(r#"{"choices":[{"index":0,"delta":{"content":"4"}}]}"#),
            SseData::Delta("4".to_string())
        );
    }

    #[test]
    fn test_parse_skips_contentless_and_malformed() {
        assert_eq!(
            parse_sse_data(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseData::Skip
        );
        assert_eq!(
            parse_sse_data(r#"{"choices":[{"delta":{"content":""}}]}"#),
            SseData::Skip
        );
        assert_eq!(parse_sse_data(r#"{"choices":[]}"#), SseData::Skip);
        assert_eq!(parse_sse_data("{not json"), SseData::Skip);
    }

    #[tokio::test]
    async fn test_map_sse_stream_yields_deltas_then_done() {
        let frames = vec![
            Ok::<_, Infallible>("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"),
            Ok(": keep-alive\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n"),
            Ok("data: [DONE]\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n"),
        ];

        let events = collect(map_sse_stream(stream::iter(frames))).await;

        assert_eq!(events, vec![delta("Hel"), delta("lo"), Ok(StreamEvent::Done)]);
    }

    #[tokio::test]
    async fn test_map_sse_stream_reassembles_split_frames() {
        let frames = vec![
            Ok::<_, Infallible>("data: {\"choices\":[{\"del"),
            Ok("ta\":{\"content\":\"4\"}}]}\n"),
            Ok("\ndata: [DONE]\n\n"),
        ];

        let events = collect(map_sse_stream(stream::iter(frames))).await;

        assert_eq!(events, vec![delta("4"), Ok(StreamEvent::Done)]);
    }

    #[tokio::test]
    async fn test_map_sse_stream_skips_malformed_json() {
        let frames = vec![
            Ok::<_, Infallible>("data: {broken\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n"),
        ];

        let events = collect(map_sse_stream(stream::iter(frames))).await;

        assert_eq!(events, vec![delta("ok"), Ok(StreamEvent::Done)]);
    }

    #[tokio::test]
    async fn test_map_sse_stream_without_done_marker_still_ends() {
        let frames = vec![Ok::<_, Infallible>(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
        )];

        let events = collect(map_sse_stream(stream::iter(frames))).await;

        assert_eq!(events, vec![delta("partial"), Ok(StreamEvent::Done)]);
    }

    #[tokio::test]
    async fn test_map_sse_stream_transport_error_ends_stream() {
        let frames = vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n"),
            Err("connection reset".to_string()),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n"),
        ];

        let events = collect(map_sse_stream(stream::iter(frames))).await;

        assert_eq!(
            events,
            vec![
                delta("Par"),
                Err("stream error: connection reset".to_string())
            ]
        );
    }
}
