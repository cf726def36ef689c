//! The adapter shell: wiring, startup, ingestion mode selection, and the
//! host command loop.
//!
//! Runs as a long-lived tokio task. Inbound: either the polling loop
//! fetches updates, or the host's HTTP router hands webhook bodies in via
//! [`Command::Ingest`]. The design assumes exactly one ingestion path is
//! active; running both is a configuration error, not handled defensively.
//! Outbound: the host drives sends, replies, broadcasts and arbitrary API
//! invokes over the command channel.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{HttpApiClient, TelegramApi};
use crate::broadcast::{BroadcastFilter, BroadcastOptions};
use crate::classify::UpdateClassifier;
use crate::config::Config;
use crate::error::AdapterError;
use crate::host::{Brain, InMemoryBrain};
use crate::outbound::Outbound;
use crate::poll::PollingLoop;
use crate::roster::{FileRoster, Roster};
use crate::types::{InboundEvent, OutboundEnvelope, Update};

/// Commands the host framework (or sibling scripts) drive the adapter with.
#[derive(Debug)]
pub enum Command {
    /// Deliver text to the envelope's room.
    Send {
        /// Destination envelope.
        envelope: OutboundEnvelope,
        /// Message text; chunked if over the platform limit.
        text: String,
    },
    /// Deliver text as a reply to the envelope's message.
    Reply {
        /// Destination envelope carrying the reply-target message id.
        envelope: OutboundEnvelope,
        /// Message text; chunked if over the platform limit.
        text: String,
    },
    /// Fan text out to roster destinations matching the options.
    Broadcast {
        /// Message text.
        text: String,
        /// Destination selection.
        options: BroadcastOptions,
    },
    /// Arbitrary platform API call (the cross-script invoke bus).
    Invoke {
        /// Bot API method name.
        method: String,
        /// JSON parameter object.
        params: Value,
    },
    /// A raw webhook body from the host router's endpoint.
    Ingest {
        /// The update as posted by the platform.
        body: Value,
    },
    /// Stop the adapter.
    Shutdown,
}

/// Bot identity learned from `getMe` at startup.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    /// Platform-assigned bot user id.
    pub id: i64,
    /// The bot's @-handle, used for mention normalization.
    pub username: String,
    /// Display name.
    pub first_name: String,
}

/// The Telegram adapter.
pub struct TelegramAdapter {
    config: Config,
    api: Arc<dyn TelegramApi>,
    brain: Arc<dyn Brain>,
    roster: Arc<dyn Roster>,
    outbound: Arc<Outbound>,
}

impl TelegramAdapter {
    /// Adapter over the public Bot API, an in-memory brain, and the
    /// file-backed roster named by the config.
    ///
    /// Fails fast when no token is configured.
    pub fn new(config: Config) -> Result<Self, AdapterError> {
        let token = config.require_token()?.to_string();
        let api: Arc<dyn TelegramApi> = Arc::new(HttpApiClient::new(&token));
        let roster: Arc<dyn Roster> = Arc::new(FileRoster::open(&config.roster_path));
        Ok(Self::with_parts(
            config,
            api,
            Arc::new(InMemoryBrain::default()),
            roster,
        ))
    }

    /// Adapter over explicit collaborators. The seam hosts and tests use.
    pub fn with_parts(
        config: Config,
        api: Arc<dyn TelegramApi>,
        brain: Arc<dyn Brain>,
        roster: Arc<dyn Roster>,
    ) -> Self {
        let outbound = Arc::new(Outbound::new(Arc::clone(&api)));
        Self {
            config,
            api,
            brain,
            roster,
            outbound,
        }
    }

    /// Resolve the bot's own identity, warning when the configured name
    /// diverges from the platform username.
    async fn identify(&self) -> Result<BotIdentity, AdapterError> {
        let me = self.api.get_me().await?;
        let identity = BotIdentity {
            id: me.id,
            username: me.username.clone().unwrap_or_default(),
            first_name: me.first_name.clone().unwrap_or_default(),
        };
        info!(name = %identity.first_name, "bot identified");

        if let Some(configured) = &self.config.bot_name {
            if configured != &identity.username {
                warn!(
                    configured = %configured,
                    platform = %identity.username,
                    "configured bot name differs from the platform username"
                );
                warn!("a differing name makes @mention handling inconsistent");
            }
        }
        Ok(identity)
    }

    /// Run the adapter until [`Command::Shutdown`] or the command channel
    /// closes.
    ///
    /// Classified events go out on `events_tx`; commands come in on
    /// `commands_rx`. Returns the fatal startup error when no token is
    /// configured.
    pub async fn run(
        self,
        events_tx: mpsc::Sender<InboundEvent>,
        mut commands_rx: mpsc::Receiver<Command>,
    ) -> Result<(), AdapterError> {
        let token = self.config.require_token()?.to_string();
        info!("telegram adapter starting");

        // getMe failure is not fatal: fall back to the configured name so
        // mention handling still works.
        let bot_name = match self.identify().await {
            Ok(identity) if !identity.username.is_empty() => identity.username,
            Ok(_) => self.config.bot_name.clone().unwrap_or_default(),
            Err(e) => {
                error!(error = %e, "failed to resolve bot identity");
                self.config.bot_name.clone().unwrap_or_default()
            }
        };
        if bot_name.is_empty() {
            warn!("no bot name available, mention normalization disabled");
        }

        let classifier = Arc::new(UpdateClassifier::new(
            &bot_name,
            Arc::clone(&self.brain),
            Arc::clone(&self.roster),
            Arc::clone(&self.api),
            events_tx,
        ));

        let poll_handle = if let Some(base) = self.config.webhook_base() {
            let endpoint = format!("{}/{}", base.trim_end_matches('/'), token);
            debug!(base = %base, "registering webhook");
            if let Err(e) = self.api.set_webhook(&endpoint).await {
                error!(error = %e, "failed to register webhook");
            }
            None
        } else {
            if let Err(e) = self.api.set_webhook("").await {
                error!(error = %e, "failed to clear webhook");
            }
            let poller = PollingLoop::new(
                Arc::clone(&self.api),
                Arc::clone(&classifier),
                self.config.poll_interval(),
            );
            Some(tokio::spawn(poller.run()))
        };

        info!("telegram adapter started");

        let broadcast = BroadcastFilter::new(Arc::clone(&self.roster), Arc::clone(&self.outbound));
        while let Some(command) = commands_rx.recv().await {
            match command {
                Command::Send { envelope, text } => {
                    if let Err(e) = self.outbound.send(&envelope, &text).await {
                        error!(room = envelope.room, error = %e, "send failed");
                    }
                }
                Command::Reply { envelope, text } => {
                    if let Err(e) = self.outbound.reply(&envelope, &text).await {
                        error!(room = envelope.room, error = %e, "reply failed");
                    }
                }
                Command::Broadcast { text, options } => {
                    if let Err(e) = broadcast.push(&text, &options).await {
                        error!(error = %e, "broadcast failed");
                    }
                }
                Command::Invoke { method, params } => {
                    if let Err(e) = self.api.invoke(&method, params).await {
                        error!(method = %method, error = %e, "api invoke failed");
                    }
                }
                Command::Ingest { body } => match serde_json::from_value::<Update>(body) {
                    Ok(update) => classifier.handle_update(update).await,
                    Err(e) => warn!(error = %e, "malformed webhook body, dropping"),
                },
                Command::Shutdown => break,
            }
        }

        if let Some(handle) = poll_handle {
            handle.abort();
        }
        info!("telegram adapter stopped");
        Ok(())
    }
}
