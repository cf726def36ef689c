//! tgrelay, a Telegram chat-platform adapter.
//!
//! Bridges the Telegram Bot API (long polling, or webhook bodies handed in
//! by a host HTTP router) into a framework-agnostic event channel. Inbound
//! updates are de-duplicated, classified into typed events, and attributed
//! to a reconciled user identity. Outbound text is chunked to the platform
//! size limit and delivered strictly in order, with a per-chunk callback.
//!
//! The host framework's brain (key-value + identity store) and the
//! broadcast roster are consumed through narrow traits in [`host`] and
//! [`roster`]; everything else the adapter needs it owns.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod api;
pub mod broadcast;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod host;
pub mod identity;
pub mod logging;
pub mod outbound;
pub mod poll;
pub mod roster;
pub mod types;
