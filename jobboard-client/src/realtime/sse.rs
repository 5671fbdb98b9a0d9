use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use reqwest::{Client, RequestBuilder, header::ACCEPT};
use serde::Serialize;
use shared::{
    config::ClientConfig,
    models::{PresenceMeta, RealtimeEvent, Timestamp},
};
use tracing::{debug, info, warn};
use url::Url;

use super::{ChannelSpec, EventStream, RealtimeTransport};
use crate::error::{GatewayError, GatewayResult};

const USER_AGENT: &str = concat!("jobboard-realtime/", env!("CARGO_PKG_VERSION"));

/// Longest line the decoder will hold while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` parser.
///
/// Chunks may split lines (or UTF-8 sequences) anywhere; bytes are held until
/// a newline arrives and a frame is emitted on each blank line. A line longer
/// than [`MAX_LINE_BYTES`] is dropped together with the event it belongs to.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    overflowed: bool,
}

impl SseDecoder {
    /// Feed a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            if std::mem::take(&mut self.overflowed) {
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            if let Some(frame) = self.feed_line(line.trim_end_matches(['\n', '\r'])) {
                frames.push(frame);
            }
        }
        if self.buffer.len() > MAX_LINE_BYTES {
            warn!(
                pending = self.buffer.len(),
                limit = MAX_LINE_BYTES,
                "realtime line too long; discarding event"
            );
            self.discard_event();
        }
        frames
    }

    fn discard_event(&mut self) {
        self.buffer = Vec::new();
        self.event = None;
        self.data.clear();
        self.id = None;
        self.overflowed = true;
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id,
        })
    }
}

/// Turn a frame into an event. Keep-alive markers and undecodable payloads yield `None`.
pub(crate) fn decode_frame(frame: &SseFrame) -> Option<RealtimeEvent> {
    let data = frame.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<RealtimeEvent>(data) {
        Ok(event) => Some(event),
        Err(tagged_err) => {
            // Some servers put the event name on the `event:` line and only the payload in `data:`.
            if let Some(name) = frame.event.as_deref()
                && let Ok(payload) = serde_json::from_str::<serde_json::Value>(data)
                && let Ok(event) = serde_json::from_value::<RealtimeEvent>(
                    serde_json::json!({ "type": name, "payload": payload }),
                )
            {
                return Some(event);
            }
            warn!(
                event = frame.event.as_deref().unwrap_or("message"),
                error = %tagged_err,
                "skipping undecodable realtime frame"
            );
            None
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum PresenceCommand<'a> {
    Track { key: &'a str, online_at: Timestamp },
    Untrack { key: &'a str },
}

/// Server-sent-events transport for the realtime backend.
#[derive(Debug, Clone)]
pub struct SseTransport {
    base_url: Url,
    http: Client,
    token: Option<String>,
}

impl SseTransport {
    /// # Errors
    /// Returns an error if `realtime_url` is not a valid URL or the HTTP client cannot be built.
    pub fn new(realtime_url: &str, token: Option<String>) -> GatewayResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Self::with_http(realtime_url, http, token)
    }

    /// Build from configuration. Only connecting is bounded by the request
    /// timeout; an open stream may stay idle indefinitely.
    ///
    /// # Errors
    /// Returns an error if the configured URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, token: Option<String>) -> GatewayResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.request_timeout())
            .build()?;
        Self::with_http(&config.realtime_url, http, token)
    }

    fn with_http(realtime_url: &str, http: Client, token: Option<String>) -> GatewayResult<Self> {
        let base_url = Url::parse(realtime_url)?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::network(format!(
                "realtime url {realtime_url} cannot carry a path"
            )));
        }
        Ok(Self {
            base_url,
            http,
            token,
        })
    }

    fn channel_url(&self, topic: &str, suffix: Option<&str>) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| GatewayError::network("realtime url cannot carry a path"))?;
            segments.pop_if_empty().push("channels").push(topic);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_presence(&self, topic: &str, command: &PresenceCommand<'_>) -> GatewayResult<()> {
        let url = self.channel_url(topic, Some("presence"))?;
        let response = self
            .authorize(self.http.post(url).json(command))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::from_status(status, &body))
    }
}

#[async_trait(?Send)]
impl RealtimeTransport for SseTransport {
    async fn subscribe(&self, channel: &ChannelSpec) -> GatewayResult<EventStream> {
        let mut url = self.channel_url(&channel.topic, None)?;
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(table) = &channel.table {
            pairs.push(("table", table.clone()));
        }
        pairs.extend(channel.filters.iter().map(|filter| ("filter", filter.to_query())));
        if let Some(key) = &channel.presence_key {
            pairs.push(("presence_key", key.clone()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        debug!(topic = %channel.topic, url = %url, "opening realtime subscription");
        let response = self
            .authorize(self.http.get(url).header(ACCEPT, "text/event-stream"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, &body));
        }
        info!(topic = %channel.topic, "realtime subscription open");

        let mut decoder = SseDecoder::default();
        let events = response.bytes_stream().flat_map(move |chunk| {
            let items: Vec<GatewayResult<RealtimeEvent>> = match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .iter()
                    .filter_map(decode_frame)
                    .map(Ok)
                    .collect(),
                Err(err) => vec![Err(GatewayError::from(err))],
            };
            stream::iter(items)
        });
        Ok(events.boxed_local())
    }

    async fn track(&self, channel: &ChannelSpec, meta: &PresenceMeta) -> GatewayResult<()> {
        self.post_presence(
            &channel.topic,
            &PresenceCommand::Track {
                key: &meta.key,
                online_at: meta.online_at,
            },
        )
        .await
    }

    async fn untrack(&self, channel: &ChannelSpec) -> GatewayResult<()> {
        let Some(key) = channel.presence_key.as_deref() else {
            debug!(topic = %channel.topic, "untrack without presence key ignored");
            return Ok(());
        };
        self.post_presence(&channel.topic, &PresenceCommand::Untrack { key })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, gateway::test_support::spawn_backend};
    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::{
            IntoResponse, Response,
            sse::{Event, Sse},
        },
        routing::{get, post},
    };
    use futures::stream as test_stream;
    use serde_json::{Value, json};
    use shared::models::UserId;
    use std::{
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    #[test]
    fn decoder_handles_split_chunks_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: row.ins").is_empty());
        assert!(decoder.push(b"ert\r\ndata: {\"a\":\ndata: 1}\n").is_empty());
        let frames = decoder.push(b"id: 42\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("row.insert".into()),
                data: "{\"a\":\n1}".into(),
                id: Some("42".into()),
            }]
        );
    }

    #[test]
    fn decoder_drops_overlong_line_and_recovers() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: row.insert\n").is_empty());
        let chunk = vec![b'x'; 64 * 1024];
        let mut pushed = 0;
        while pushed <= MAX_LINE_BYTES {
            assert!(decoder.push(&chunk).is_empty());
            pushed += chunk.len();
            assert!(decoder.buffer.len() <= MAX_LINE_BYTES);
        }
        assert!(decoder.buffer.is_empty());

        let frames = decoder.push(b"xxxx\n\ndata: after\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "after".into(),
                id: None,
            }]
        );
    }

    #[test]
    fn decoder_skips_comments_and_empty_events() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b": keep-alive\n\nevent: ping\n\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn decoder_survives_split_utf8() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: héllo\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let frames = decoder.push(&bytes[split..]);
        assert_eq!(frames[0].data, "héllo");
    }

    #[test]
    fn decode_frame_accepts_tagged_and_named_payloads() {
        let tagged = SseFrame {
            event: Some("row.insert".into()),
            data: r#"{"type":"row.insert","payload":{"table":"messages","record":{}}}"#.into(),
            id: None,
        };
        assert!(matches!(
            decode_frame(&tagged),
            Some(RealtimeEvent::RowInsert { .. })
        ));

        let named = SseFrame {
            event: Some("presence.sync".into()),
            data: r#"{"members":[{"key":"4"}]}"#.into(),
            id: None,
        };
        assert!(matches!(
            decode_frame(&named),
            Some(RealtimeEvent::PresenceSync { .. })
        ));

        let done = SseFrame {
            data: "[DONE]".into(),
            ..SseFrame::default()
        };
        assert_eq!(decode_frame(&done), None);

        let garbage = SseFrame {
            data: "not json".into(),
            ..SseFrame::default()
        };
        assert_eq!(decode_frame(&garbage), None);
    }

    async fn channel_stream(
        Path(topic): Path<String>,
        Query(query): Query<Vec<(String, String)>>,
        headers: HeaderMap,
    ) -> Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer tok") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no token"}))).into_response();
        }
        let expected = vec![
            ("table".to_string(), "messages".to_string()),
            ("filter".to_string(), "sender_id=eq.7".to_string()),
            ("filter".to_string(), "recipient_id=eq.7".to_string()),
        ];
        if topic != "messages:7" || query != expected {
            return StatusCode::BAD_REQUEST.into_response();
        }

        let insert = json!({
            "type": "row.insert",
            "payload": {"table": "messages", "record": {"id": 1}}
        });
        let events = vec![
            Ok::<_, Infallible>(Event::default().comment("keep-alive")),
            Ok(Event::default().event("row.insert").data(insert.to_string())),
            Ok(Event::default().data("[DONE]")),
        ];
        Sse::new(test_stream::iter(events)).into_response()
    }

    #[tokio::test]
    async fn subscribe_streams_decoded_events() {
        let router = Router::new().route("/api/channels/{topic}", get(channel_stream));
        let base = spawn_backend(router).await;
        let transport = SseTransport::new(&base, Some("tok".into())).unwrap();

        let stream = transport
            .subscribe(&ChannelSpec::message_inserts(UserId(7)))
            .await
            .unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 1);
        let Ok(RealtimeEvent::RowInsert { payload }) = &events[0] else {
            panic!("expected row insert, got {:?}", events[0]);
        };
        assert_eq!(payload.record["id"], 1);
    }

    #[tokio::test]
    async fn subscribe_without_token_is_unauthorized() {
        let router = Router::new().route("/api/channels/{topic}", get(channel_stream));
        let base = spawn_backend(router).await;
        let transport = SseTransport::new(&base, None).unwrap();

        let err = match transport
            .subscribe(&ChannelSpec::message_inserts(UserId(7)))
            .await
        {
            Ok(_) => panic!("subscription should be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn track_and_untrack_post_presence_commands() {
        let received: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();
        let router = Router::new()
            .route(
                "/api/channels/{topic}/presence",
                post(
                    |State(log): State<Arc<Mutex<Vec<(String, Value)>>>>,
                     Path(topic): Path<String>,
                     Json(body): Json<Value>| async move {
                        log.lock().unwrap().push((topic, body));
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .with_state(received.clone());
        let base = spawn_backend(router).await;
        let transport = SseTransport::new(&base, Some("tok".into())).unwrap();
        let channel = ChannelSpec::presence("online-users", UserId(3));

        transport
            .track(&channel, &PresenceMeta::online(UserId(3)))
            .await
            .unwrap();
        transport.untrack(&channel).await.unwrap();

        let log = received.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "online-users");
        assert_eq!(log[0].1["event"], "track");
        assert_eq!(log[0].1["key"], "3");
        assert!(log[0].1["online_at"].is_string());
        assert_eq!(log[1].1, json!({"event": "untrack", "key": "3"}));
    }

    #[test]
    fn channel_urls_append_to_base_path() {
        let transport = SseTransport::new("http://localhost:4000/realtime/", None).unwrap();
        let url = transport
            .channel_url("online-users", Some("presence"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4000/realtime/channels/online-users/presence"
        );
    }
}
