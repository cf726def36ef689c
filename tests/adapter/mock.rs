//! Scripted Bot API mock shared by the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use tgrelay::api::TelegramApi;
use tgrelay::error::AdapterError;

/// Records every invoke and replays scripted responses per method.
///
/// Methods without a scripted response get a benign default: an empty
/// batch for `getUpdates`, a fixed identity for `getMe`, `null` otherwise.
pub struct ScriptedApi {
    calls: Mutex<Vec<(String, Value)>>,
    responses: Mutex<HashMap<String, VecDeque<Result<Value, String>>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
        }
    }

    /// Queue the next response for `method`.
    pub fn script(&self, method: &str, response: Result<Value, &str>) {
        let mut responses = self.responses.lock().expect("responses mutex");
        responses
            .entry(method.to_string())
            .or_default()
            .push_back(response.map_err(str::to_string));
    }

    /// Parameter objects of every call to `method`, in call order.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        let calls = self.calls.lock().expect("calls mutex");
        calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Wait until `method` has been called at least `count` times.
    pub async fn wait_for_calls(&self, method: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if self.calls_to(method).len() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("expected API calls never arrived");
    }
}

#[async_trait]
impl TelegramApi for ScriptedApi {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        {
            let mut calls = self.calls.lock().expect("calls mutex");
            calls.push((method.to_string(), params));
        }

        let scripted = {
            let mut responses = self.responses.lock().expect("responses mutex");
            responses.get_mut(method).and_then(VecDeque::pop_front)
        };
        if let Some(response) = scripted {
            return response.map_err(AdapterError::Api);
        }

        match method {
            "getUpdates" => Ok(json!([])),
            "getMe" => Ok(json!({
                "id": 99,
                "username": "relay",
                "first_name": "Relay",
            })),
            _ => Ok(Value::Null),
        }
    }
}

/// A plain text-message update body, as the platform would post it.
pub fn text_update(update_id: i64, message_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": {"id": 7, "username": "ada", "first_name": "Ada"},
            "chat": {"id": 7, "type": "private"},
            "text": text,
        }
    })
}
