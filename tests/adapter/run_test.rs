//! Adapter shell: startup modes, command loop, webhook ingestion.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;

use tgrelay::adapter::{Command, TelegramAdapter};
use tgrelay::api::TelegramApi;
use tgrelay::config::Config;
use tgrelay::error::AdapterError;
use tgrelay::host::InMemoryBrain;
use tgrelay::roster::MemoryRoster;
use tgrelay::types::{InboundEvent, OutboundEnvelope};

use crate::mock::{text_update, ScriptedApi};

fn config(webhook: Option<&str>) -> Config {
    let mut config = Config::default();
    config.token = Some("t0ken".to_string());
    config.webhook = webhook.map(str::to_string);
    config.interval_ms = 5;
    config
}

struct Running {
    api: Arc<ScriptedApi>,
    events_rx: mpsc::Receiver<InboundEvent>,
    commands_tx: mpsc::Sender<Command>,
    task: tokio::task::JoinHandle<Result<(), AdapterError>>,
}

impl Running {
    async fn shutdown(self) {
        self.commands_tx
            .send(Command::Shutdown)
            .await
            .expect("send shutdown");
        self.task.await.expect("join").expect("run");
    }
}

fn start(webhook: Option<&str>) -> Running {
    let api = Arc::new(ScriptedApi::new());
    let adapter = TelegramAdapter::with_parts(
        config(webhook),
        Arc::clone(&api) as Arc<dyn TelegramApi>,
        Arc::new(InMemoryBrain::default()),
        Arc::new(MemoryRoster::default()),
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let (commands_tx, commands_rx) = mpsc::channel(16);
    let task = tokio::spawn(adapter.run(events_tx, commands_rx));
    Running {
        api,
        events_rx,
        commands_tx,
        task,
    }
}

#[tokio::test]
async fn missing_token_fails_construction() {
    let result = TelegramAdapter::new(Config::default());
    assert!(matches!(result, Err(AdapterError::MissingToken)));
}

#[tokio::test]
async fn webhook_mode_registers_the_endpoint_and_ingests_bodies() {
    let mut running = start(Some("https://bot.example.com"));

    running.api.wait_for_calls("setWebHook", 1).await;
    let hooks = running.api.calls_to("setWebHook");
    assert_eq!(hooks[0]["url"], "https://bot.example.com/t0ken");

    running
        .commands_tx
        .send(Command::Ingest {
            body: text_update(1, 10, "hi"),
        })
        .await
        .expect("send ingest");

    let event = running.events_rx.recv().await.expect("event");
    assert!(matches!(event, InboundEvent::Text { .. }));

    // Webhook mode never polls.
    assert!(running.api.calls_to("getUpdates").is_empty());

    running.shutdown().await;
}

#[tokio::test]
async fn webhook_mode_drops_malformed_bodies() {
    let mut running = start(Some("https://bot.example.com"));

    running
        .commands_tx
        .send(Command::Ingest {
            body: json!({"not": "an update"}),
        })
        .await
        .expect("send ingest");

    // A well-formed update after the malformed one still flows through.
    running
        .commands_tx
        .send(Command::Ingest {
            body: text_update(2, 11, "still alive"),
        })
        .await
        .expect("send ingest");

    let event = running.events_rx.recv().await.expect("event");
    assert_eq!(event.message_id(), 11);

    running.shutdown().await;
}

#[tokio::test]
async fn polling_mode_clears_the_webhook_and_polls() {
    let running = start(None);

    running.api.wait_for_calls("setWebHook", 1).await;
    assert_eq!(running.api.calls_to("setWebHook")[0]["url"], "");

    running.api.wait_for_calls("getUpdates", 1).await;

    running.shutdown().await;
}

#[tokio::test]
async fn send_command_delivers_to_the_room() {
    let running = start(Some("https://bot.example.com"));

    running
        .commands_tx
        .send(Command::Send {
            envelope: OutboundEnvelope {
                room: 5,
                ..OutboundEnvelope::default()
            },
            text: "hello".to_string(),
        })
        .await
        .expect("send command");

    running.api.wait_for_calls("sendMessage", 1).await;
    let sends = running.api.calls_to("sendMessage");
    assert_eq!(sends[0]["chat_id"], 5);
    assert_eq!(sends[0]["text"], "hello");

    running.shutdown().await;
}

#[tokio::test]
async fn invoke_command_drives_an_arbitrary_api_call() {
    let running = start(Some("https://bot.example.com"));

    running
        .commands_tx
        .send(Command::Invoke {
            method: "sendChatAction".to_string(),
            params: json!({"chat_id": 1, "action": "typing"}),
        })
        .await
        .expect("send command");

    running.api.wait_for_calls("sendChatAction", 1).await;
    let calls = running.api.calls_to("sendChatAction");
    assert_eq!(calls[0]["action"], "typing");

    running.shutdown().await;
}
