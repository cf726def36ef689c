//! Adapter error taxonomy.
//!
//! Only one error is fatal: a missing bot token at startup. Platform API
//! failures are recoverable and logged at their call sites; duplicate
//! updates are dropped silently at warn level. No operation retries.

use thiserror::Error;

use crate::host::HostError;

/// Errors produced by the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The Telegram API answered with `ok: false`.
    #[error("Telegram API error: {0}")]
    Api(String),
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// A response body or parameter object failed to (de)serialize.
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
    /// No bot token was configured. Fatal at startup.
    #[error("the TELEGRAM_TOKEN configuration value is required")]
    MissingToken,
    /// An outbound payload carried no text.
    #[error("refusing to send an empty message payload")]
    EmptyPayload,
    /// A host-framework collaborator (brain or roster) failed.
    #[error("host store error: {0}")]
    Host(#[from] HostError),
    /// The host framework's event channel closed.
    #[error("host framework channel closed")]
    ChannelClosed,
}
