//! Outbound delivery: chunk boundaries, ordering, callback forwarding.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use tgrelay::api::TelegramApi;
use tgrelay::error::AdapterError;
use tgrelay::outbound::Outbound;
use tgrelay::types::OutboundEnvelope;

use crate::mock::ScriptedApi;

fn outbound(api: &Arc<ScriptedApi>) -> Outbound {
    Outbound::new(Arc::clone(api) as Arc<dyn TelegramApi>)
}

fn room(room: i64) -> OutboundEnvelope {
    OutboundEnvelope {
        room,
        ..OutboundEnvelope::default()
    }
}

#[tokio::test]
async fn text_at_the_limit_is_one_call() {
    let api = Arc::new(ScriptedApi::new());
    let text = "a".repeat(4096);

    outbound(&api).send(&room(1), &text).await.expect("send");

    let sends = api.calls_to("sendMessage");
    assert_eq!(sends.len(), 1);
    assert_eq!(
        sends[0]["text"].as_str().expect("text").chars().count(),
        4096
    );
    assert_eq!(sends[0]["chat_id"], 1);
}

#[tokio::test]
async fn long_text_is_two_ordered_calls() {
    let api = Arc::new(ScriptedApi::new());
    let text = "a".repeat(5000);

    outbound(&api).send(&room(1), &text).await.expect("send");

    let sends = api.calls_to("sendMessage");
    assert_eq!(sends.len(), 2);
    assert_eq!(
        sends[0]["text"].as_str().expect("text").chars().count(),
        4096
    );
    assert_eq!(
        sends[1]["text"].as_str().expect("text").chars().count(),
        904
    );
}

#[tokio::test]
async fn newlines_do_not_affect_the_split() {
    let api = Arc::new(ScriptedApi::new());
    let mut text = String::new();
    for block in ["a", "b", "c", "d", "e"] {
        text.push_str(&block.repeat(1000));
        text.push('\n');
    }

    outbound(&api).send(&room(1), &text).await.expect("send");

    let sends = api.calls_to("sendMessage");
    assert_eq!(sends.len(), 2);
    let first = sends[0]["text"].as_str().expect("text");
    assert_eq!(first.chars().count(), 4096);
    assert!(!first.ends_with('\n'));
}

#[tokio::test]
async fn empty_text_is_rejected_without_an_api_call() {
    let api = Arc::new(ScriptedApi::new());

    let result = outbound(&api).send(&room(1), "").await;

    assert!(matches!(result, Err(AdapterError::EmptyPayload)));
    assert!(api.calls_to("sendMessage").is_empty());
}

#[tokio::test]
async fn per_chunk_callback_sees_each_raw_outcome() {
    let api = Arc::new(ScriptedApi::new());
    api.script("sendMessage", Ok(json!({"message_id": 1})));
    api.script("sendMessage", Err("flood control"));

    let mut delivered = 0usize;
    let mut failed = 0usize;
    let mut payload = Map::new();
    payload.insert("chat_id".to_string(), Value::from(1));
    payload.insert("text".to_string(), Value::String("a".repeat(5000)));

    outbound(&api)
        .api_send(payload, |outcome| match outcome {
            Ok(_) => delivered = delivered.saturating_add(1),
            Err(_) => failed = failed.saturating_add(1),
        })
        .await
        .expect("api_send");

    // Both segments were dispatched and each raw outcome was forwarded.
    assert_eq!(delivered, 1);
    assert_eq!(failed, 1);
    assert_eq!(api.calls_to("sendMessage").len(), 2);
}

#[tokio::test]
async fn reply_carries_the_reply_target() {
    let api = Arc::new(ScriptedApi::new());
    let envelope = OutboundEnvelope {
        room: 5,
        message_id: Some(42),
        extra: None,
    };

    outbound(&api).reply(&envelope, "pong").await.expect("reply");

    let sends = api.calls_to("sendMessage");
    assert_eq!(sends[0]["reply_to_message_id"], 42);
    assert_eq!(sends[0]["chat_id"], 5);
}

#[tokio::test]
async fn envelope_extras_override_derived_fields() {
    let api = Arc::new(ScriptedApi::new());
    let mut extra = Map::new();
    extra.insert("parse_mode".to_string(), Value::String("HTML".to_string()));
    let envelope = OutboundEnvelope {
        room: 5,
        message_id: None,
        extra: Some(extra),
    };

    outbound(&api)
        .send(&envelope, "auto *markdown* here")
        .await
        .expect("send");

    let sends = api.calls_to("sendMessage");
    assert_eq!(sends[0]["parse_mode"], "HTML");
}
