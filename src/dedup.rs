//! Inbound update de-duplication over the brain's persistent seen-set.
//!
//! Seen-set entries are never evicted; unbounded growth is an accepted
//! trade-off of the design. Check-then-mark is effectively atomic because
//! all updates of a fetch batch are processed sequentially on one task.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::host::{Brain, HostError};

/// Guards against re-processing the same inbound update twice.
pub struct UpdateDeduplicator {
    brain: Arc<dyn Brain>,
}

impl UpdateDeduplicator {
    /// Deduplicator backed by the given brain.
    pub fn new(brain: Arc<dyn Brain>) -> Self {
        Self { brain }
    }

    /// Returns true exactly once per message id, marking it seen as a side
    /// effect. A repeat id logs a warning and returns false.
    pub fn should_process(&self, message_id: i64) -> Result<bool, HostError> {
        let key = format!("handled{message_id}");
        if matches!(self.brain.get(&key)?, Some(Value::Bool(true))) {
            warn!(message_id, "message already handled, dropping");
            return Ok(false);
        }
        self.brain.set(&key, Value::Bool(true))?;
        Ok(true)
    }
}
