//! Outbound message chunking and delivery.
//!
//! Telegram caps message text at 4096 characters. Longer payloads are cut
//! into fixed-width segments with no regard for word or line boundaries,
//! and delivered strictly sequentially: segment *n+1* goes out only after
//! the platform has acknowledged (success or failure) segment *n*. The
//! supplied callback sees the raw per-segment outcome. Delivery failures
//! are terminal for that attempt; nothing retries.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::api::TelegramApi;
use crate::error::AdapterError;
use crate::types::OutboundEnvelope;

/// Platform limit on message text length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// The four markdown shapes that flip parse_mode on automatically.
static MARKDOWN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\*.+\*", r"_.+_", r"\[.+\]\(.+\)", r"`.+`"]
        .iter()
        .map(|p| Regex::new(p).expect("static markdown pattern"))
        .collect()
});

/// Chunked, strictly ordered delivery to the platform.
pub struct Outbound {
    api: Arc<dyn TelegramApi>,
}

impl Outbound {
    /// Sender backed by the given API client.
    pub fn new(api: Arc<dyn TelegramApi>) -> Self {
        Self { api }
    }

    /// Split text into platform-size-bounded chunks.
    ///
    /// Fixed-width by character count; a chunk may end mid-word or
    /// mid-line. Multi-byte characters never split.
    pub fn chunk_text(text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut count = 0usize;
        for ch in text.chars() {
            if count == MAX_MESSAGE_CHARS {
                chunks.push(std::mem::take(&mut current));
                count = 0;
            }
            current.push(ch);
            count = count.saturating_add(1);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Auto-detect markdown in the payload text, then shallow-merge the
    /// envelope extras on top. Extras always win, including over the
    /// parse_mode just set.
    pub fn apply_extra_options(payload: &mut Map<String, Value>, extra: Option<&Map<String, Value>>) {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if MARKDOWN_PATTERNS.iter().any(|p| p.is_match(text)) {
            payload.insert(
                "parse_mode".to_string(),
                Value::String("Markdown".to_string()),
            );
        }

        if let Some(extra) = extra {
            for (key, value) in extra {
                payload.insert(key.clone(), value.clone());
            }
        }
    }

    /// Deliver a payload chunk by chunk, invoking `on_chunk` with the raw
    /// platform outcome of each segment before the next one is dispatched.
    ///
    /// An empty text is rejected up front with [`AdapterError::EmptyPayload`];
    /// no API call is made. A failed segment does not stop later segments.
    pub async fn api_send<F>(
        &self,
        mut payload: Map<String, Value>,
        mut on_chunk: F,
    ) -> Result<(), AdapterError>
    where
        F: FnMut(Result<&Value, &AdapterError>) + Send,
    {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if text.is_empty() {
            return Err(AdapterError::EmptyPayload);
        }

        let chunks = Self::chunk_text(&text);
        debug!(
            length = text.chars().count(),
            parts = chunks.len(),
            "chunked outbound message"
        );

        for chunk in chunks {
            payload.insert("text".to_string(), Value::String(chunk));
            match self
                .api
                .invoke("sendMessage", Value::Object(payload.clone()))
                .await
            {
                Ok(result) => on_chunk(Ok(&result)),
                Err(e) => on_chunk(Err(&e)),
            }
        }
        Ok(())
    }

    /// Send text to the envelope's room.
    pub async fn send(
        &self,
        envelope: &OutboundEnvelope,
        text: &str,
    ) -> Result<(), AdapterError> {
        let mut payload = Map::new();
        payload.insert("chat_id".to_string(), Value::from(envelope.room));
        payload.insert("text".to_string(), Value::String(text.to_string()));
        Self::apply_extra_options(&mut payload, envelope.extra.as_ref());

        let room = envelope.room;
        self.api_send(payload, move |outcome| match outcome {
            Ok(_) => info!(room, "message delivered"),
            Err(e) => error!(room, error = %e, "message delivery failed"),
        })
        .await
    }

    /// Send text as a reply to the envelope's message.
    ///
    /// Identical to [`Outbound::send`] apart from the reply-target field;
    /// envelope extras can still override it.
    pub async fn reply(
        &self,
        envelope: &OutboundEnvelope,
        text: &str,
    ) -> Result<(), AdapterError> {
        let mut payload = Map::new();
        payload.insert("chat_id".to_string(), Value::from(envelope.room));
        payload.insert("text".to_string(), Value::String(text.to_string()));
        if let Some(message_id) = envelope.message_id {
            payload.insert("reply_to_message_id".to_string(), Value::from(message_id));
        }
        Self::apply_extra_options(&mut payload, envelope.extra.as_ref());

        let room = envelope.room;
        let target = envelope.message_id;
        self.api_send(payload, move |outcome| match outcome {
            Ok(_) => info!(room, reply_to = target, "reply delivered"),
            Err(e) => error!(room, reply_to = target, error = %e, "reply delivery failed"),
        })
        .await
    }
}
