//! Roster broadcast fan-out.
//!
//! Selects destinations whose display name matches a rule and sends the
//! text to each through the chunked delivery path, fire-and-forget in
//! roster order. The call returns once every send has been initiated;
//! individual delivery failures are logged and swallowed.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::outbound::Outbound;
use crate::roster::Roster;
use crate::types::{Destination, OutboundEnvelope};

/// How a broadcast rule matches destination names.
pub enum BroadcastRule {
    /// Pattern matched against each name: a regex (the default) or, with
    /// `match_as_regex` off, exact equality.
    Pattern(String),
    /// Arbitrary predicate over the name.
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl fmt::Debug for BroadcastRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            Self::Predicate(_) => f.debug_tuple("Predicate").field(&"<closure>").finish(),
        }
    }
}

/// Destination scope for a broadcast. Only the full roster is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BroadcastScope {
    /// Every roster destination.
    #[default]
    All,
}

/// Options controlling destination selection.
#[derive(Debug)]
pub struct BroadcastOptions {
    /// Destination filter; `None` selects everything in scope.
    pub rule: Option<BroadcastRule>,
    /// Which roster slice to start from.
    pub scope: BroadcastScope,
    /// Whether a [`BroadcastRule::Pattern`] is a regex (true, the default)
    /// or an exact name (false).
    pub match_as_regex: bool,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            rule: None,
            scope: BroadcastScope::All,
            match_as_regex: true,
        }
    }
}

/// Fans a message out to matching roster destinations.
pub struct BroadcastFilter {
    roster: Arc<dyn Roster>,
    outbound: Arc<Outbound>,
}

impl BroadcastFilter {
    /// Filter over the given roster, delivering through `outbound`.
    pub fn new(roster: Arc<dyn Roster>, outbound: Arc<Outbound>) -> Self {
        Self { roster, outbound }
    }

    /// Send `text` to every destination matching `options`, fire-and-forget
    /// in roster order. Returns the number of deliveries initiated once all
    /// of them have been spawned.
    pub async fn push(
        &self,
        text: &str,
        options: &BroadcastOptions,
    ) -> Result<usize, AdapterError> {
        let BroadcastScope::All = options.scope;
        let destinations = self.roster.list()?;
        let selected: Vec<Destination> = destinations
            .into_iter()
            .filter(|d| Self::matches(d, options))
            .collect();
        debug!(count = selected.len(), "broadcasting to destinations");

        let mut initiated = 0usize;
        for destination in selected {
            self.spawn_send(destination, text);
            initiated = initiated.saturating_add(1);
        }
        Ok(initiated)
    }

    fn spawn_send(&self, destination: Destination, text: &str) -> JoinHandle<()> {
        let outbound = Arc::clone(&self.outbound);
        let envelope = OutboundEnvelope {
            room: destination.id,
            ..OutboundEnvelope::default()
        };
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(e) = outbound.send(&envelope, &text).await {
                warn!(room = envelope.room, error = %e, "broadcast delivery failed");
            }
        })
    }

    pub(crate) fn matches(destination: &Destination, options: &BroadcastOptions) -> bool {
        match &options.rule {
            None => true,
            Some(BroadcastRule::Predicate(pred)) => pred(&destination.name),
            Some(BroadcastRule::Pattern(pattern)) => {
                if options.match_as_regex {
                    match Regex::new(pattern) {
                        Ok(re) => re.is_match(&destination.name),
                        Err(e) => {
                            warn!(pattern = %pattern, error = %e, "invalid broadcast pattern");
                            false
                        }
                    }
                } else {
                    destination.name == *pattern
                }
            }
        }
    }
}
