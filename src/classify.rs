//! Inbound update classification and dispatch.
//!
//! A raw update's working payload is the first present of `message`,
//! `edited_message`, `callback_query`. Classification is first-match-wins
//! in a fixed priority order: text, callback data, member joined, member
//! left, title changed, catch-all. Every emitted event carries the acting
//! user as resolved by [`IdentityResolver`], and no message id passes the
//! deduplicator twice.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::TelegramApi;
use crate::dedup::UpdateDeduplicator;
use crate::host::Brain;
use crate::identity::IdentityResolver;
use crate::roster::Roster;
use crate::types::{CallbackQuery, Chat, InboundEvent, Message, RemoteUser, Update, User};

/// Normalize inbound text so a mention-based command router recognizes it.
///
/// Private-chat messages (`chat_id > 0`) and messages that already mention
/// the bot are rewritten to start with `@bot_name` exactly once: the first
/// mention (matched case-insensitively) is removed and the canonical
/// mention is prefixed. Group-chat messages without a mention pass through
/// unchanged.
pub fn clean_message_text(bot_name: &str, text: &str, chat_id: i64) -> String {
    // An empty name would make the mention a bare "@", matching any
    // at-sign in the text. Nothing to normalize against; pass through.
    if bot_name.is_empty() {
        return text.to_string();
    }

    let mention = format!("@{bot_name}");
    let pattern = match Regex::new(&format!("(?i){}", regex::escape(&mention))) {
        Ok(p) => p,
        Err(_) => return text.to_string(),
    };

    let mentioned = pattern.is_match(text);
    if chat_id > 0 || mentioned {
        let remainder = if mentioned {
            pattern.replacen(text, 1, "").into_owned()
        } else {
            text.to_string()
        };
        format!("{mention} {}", remainder.trim())
    } else {
        text.to_string()
    }
}

/// Routes raw updates to typed [`InboundEvent`]s on the host channel.
pub struct UpdateClassifier {
    bot_name: String,
    identity: IdentityResolver,
    dedup: UpdateDeduplicator,
    roster: Arc<dyn Roster>,
    api: Arc<dyn TelegramApi>,
    events_tx: mpsc::Sender<InboundEvent>,
}

impl UpdateClassifier {
    /// Classifier over the given collaborators. `bot_name` drives mention
    /// normalization.
    pub fn new(
        bot_name: &str,
        brain: Arc<dyn Brain>,
        roster: Arc<dyn Roster>,
        api: Arc<dyn TelegramApi>,
        events_tx: mpsc::Sender<InboundEvent>,
    ) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            identity: IdentityResolver::new(Arc::clone(&brain)),
            dedup: UpdateDeduplicator::new(brain),
            roster,
            api,
            events_tx,
        }
    }

    /// Classify and dispatch one raw update.
    ///
    /// Never fails the surrounding batch: every error path logs and drops
    /// this update only.
    pub async fn handle_update(&self, update: Update) {
        debug!(update_id = update.update_id, "handling update");

        if let Some(message) = update.message.or(update.edited_message) {
            self.handle_message(message).await;
        } else if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await;
        } else {
            debug!(update_id = update.update_id, "update carried no payload, skipping");
        }
    }

    async fn handle_message(&self, message: Message) {
        info!(message_id = message.message_id, "receiving message");
        if !self.passes_dedup(message.message_id) {
            return;
        }
        self.notify_roster(&message.chat);

        if let Some(event) = self.classify_message(message) {
            self.emit(event).await;
        }
    }

    async fn handle_callback(&self, callback: CallbackQuery) {
        let Some(message) = callback.message.clone() else {
            // No chat or message context to attribute the press to.
            debug!(callback_id = %callback.id, "callback query without message, dropping");
            return;
        };

        info!(message_id = message.message_id, "receiving callback query");
        if !self.passes_dedup(message.message_id) {
            return;
        }
        self.notify_roster(&message.chat);

        if let Some(data) = &callback.data {
            let text = clean_message_text(&self.bot_name, data, message.chat.id);
            let Some(user) = self.resolve(&callback.from, &message.chat) else {
                return;
            };
            debug!(user_id = user.id, "received callback data");

            self.acknowledge(callback.id.clone());
            self.emit(InboundEvent::Text {
                user,
                text,
                message_id: message.message_id,
            })
            .await;
        } else {
            let user = self.resolve(&callback.from, &message.chat);
            let message_id = message.message_id;
            let raw = serde_json::to_value(&callback).unwrap_or(Value::Null);
            self.emit(InboundEvent::CatchAll {
                user,
                raw,
                message_id,
            })
            .await;
        }
    }

    // Priority order is load-bearing: a malformed payload satisfying
    // several branches takes the earliest one.
    fn classify_message(&self, message: Message) -> Option<InboundEvent> {
        let chat = message.chat.clone();
        let message_id = message.message_id;

        if let Some(text) = &message.text {
            let Some(from) = &message.from else {
                debug!(message_id, "text message without sender, dropping");
                return None;
            };
            let text = clean_message_text(&self.bot_name, text, chat.id);
            let user = self.resolve(from, &chat)?;
            debug!(user_id = user.id, "received text message");
            return Some(InboundEvent::Text {
                user,
                text,
                message_id,
            });
        }

        if let Some(member) = &message.new_chat_member {
            let user = self.resolve(member, &chat)?;
            info!(user_id = user.id, chat_id = chat.id, "user joined chat");
            return Some(InboundEvent::Enter { user, message_id });
        }

        if let Some(member) = &message.left_chat_member {
            let user = self.resolve(member, &chat)?;
            info!(user_id = user.id, chat_id = chat.id, "user left chat");
            return Some(InboundEvent::Leave { user, message_id });
        }

        if let Some(title) = &message.new_chat_title {
            let Some(from) = &message.from else {
                debug!(message_id, "title change without sender, dropping");
                return None;
            };
            let user = self.resolve(from, &chat)?;
            info!(user_id = user.id, chat_id = chat.id, title = %title, "chat title changed");
            return Some(InboundEvent::Topic {
                user,
                title: title.clone(),
                message_id,
            });
        }

        let user = message
            .from
            .as_ref()
            .and_then(|from| self.resolve(from, &chat));
        let raw = serde_json::to_value(&message).unwrap_or(Value::Null);
        Some(InboundEvent::CatchAll {
            user,
            raw,
            message_id,
        })
    }

    fn passes_dedup(&self, message_id: i64) -> bool {
        match self.dedup.should_process(message_id) {
            Ok(fresh) => fresh,
            Err(e) => {
                error!(message_id, error = %e, "seen-set unavailable, dropping update");
                false
            }
        }
    }

    fn resolve(&self, user: &User, chat: &Chat) -> Option<RemoteUser> {
        match self.identity.resolve(user, chat) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                error!(user_id = user.id, error = %e, "identity store unavailable, dropping update");
                None
            }
        }
    }

    // Best-effort: a failing roster never blocks classification.
    fn notify_roster(&self, chat: &Chat) {
        if chat.kind.as_deref() == Some("group") {
            let title = chat.title.clone().unwrap_or_default();
            if let Err(e) = self.roster.update(chat.id, &title) {
                debug!(chat_id = chat.id, error = %e, "roster update failed");
            }
        }
    }

    // Fire-and-forget; an acknowledgment failure is logged and nothing else.
    fn acknowledge(&self, callback_id: String) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.answer_callback_query(&callback_id).await {
                warn!(callback_id = %callback_id, error = %e, "callback acknowledgment failed");
            }
        });
    }

    async fn emit(&self, event: InboundEvent) {
        if self.events_tx.send(event).await.is_err() {
            error!("host framework channel closed, event dropped");
        }
    }
}
