//! Telegram Bot API client.
//!
//! Every platform call goes through a single generic [`TelegramApi::invoke`]
//! seam, mirroring the `telegram:invoke` surface the adapter exposes to
//! sibling scripts. Typed helpers for the handful of methods the adapter
//! itself uses are provided on the trait, so mocks only implement `invoke`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AdapterError;
use crate::types::{ApiResponse, Update, User};

/// Base URL for the Telegram Bot API.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Narrow seam over the Bot API.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Call a Bot API method with a JSON parameter object, returning the
    /// raw `result` payload.
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, AdapterError>;

    /// Fetch the bot's own identity.
    async fn get_me(&self) -> Result<User, AdapterError> {
        let result = self.invoke("getMe", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Fetch updates at and after `offset`, at most `limit` of them.
    async fn get_updates(&self, offset: i64, limit: u8) -> Result<Vec<Update>, AdapterError> {
        let result = self
            .invoke("getUpdates", json!({ "offset": offset, "limit": limit }))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Register a webhook endpoint; an empty `url` clears it.
    async fn set_webhook(&self, url: &str) -> Result<(), AdapterError> {
        self.invoke("setWebHook", json!({ "url": url })).await?;
        Ok(())
    }

    /// Acknowledge an inline-keyboard callback press.
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), AdapterError> {
        self.invoke(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_query_id }),
        )
        .await?;
        Ok(())
    }
}

/// reqwest-backed Bot API client.
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpApiClient {
    /// Client against the public Bot API.
    pub fn new(token: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_BASE, token)
    }

    /// Client against a custom base URL (local Bot API server, tests).
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl TelegramApi for HttpApiClient {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        debug!(method, "invoking Bot API method");

        let resp = self.client.post(&url).json(&params).send().await?;
        let body: ApiResponse<Value> = resp.json().await?;

        if !body.ok {
            return Err(AdapterError::Api(
                body.description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}
