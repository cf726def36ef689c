//! Self-rescheduling update fetch cycle.
//!
//! One cycle fetches updates after the cursor and feeds them to the
//! classifier strictly in the order received, synchronously, before the
//! next cycle is scheduled. Fetch failures keep the cadence: the loop's
//! natural recurrence is the only retry mechanism, with no backoff. A
//! cycle only ever runs to completion before the next starts, which is
//! what makes the dedup check-then-mark effectively atomic.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::TelegramApi;
use crate::classify::UpdateClassifier;

/// Number of updates requested per fetch cycle.
const FETCH_LIMIT: u8 = 10;

/// Polls `getUpdates` and dispatches results to the classifier.
pub struct PollingLoop {
    api: Arc<dyn TelegramApi>,
    classifier: Arc<UpdateClassifier>,
    interval: Duration,
    cursor: i64,
}

impl PollingLoop {
    /// Loop over the given API client and classifier, fetching on a fixed
    /// `interval`.
    pub fn new(
        api: Arc<dyn TelegramApi>,
        classifier: Arc<UpdateClassifier>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            classifier,
            interval,
            cursor: 0,
        }
    }

    /// Resume from a known stream position instead of the platform's
    /// next-available one.
    pub fn resume_from(&mut self, cursor: i64) {
        self.cursor = cursor;
    }

    /// The current update-stream cursor: the id of the last processed
    /// update. Only ever advances.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// One fetch-and-dispatch pass.
    ///
    /// On success the cursor advances to the last result's update id
    /// before dispatch, so a restart of the cycle never re-fetches the
    /// batch. On failure the error is logged and the pass ends.
    pub async fn cycle(&mut self) {
        let offset = self.cursor.saturating_add(1);
        match self.api.get_updates(offset, FETCH_LIMIT).await {
            Ok(updates) => {
                if let Some(last) = updates.last() {
                    self.cursor = last.update_id;
                }
                debug!(count = updates.len(), cursor = self.cursor, "fetched updates");
                for update in updates {
                    self.classifier.handle_update(update).await;
                }
            }
            Err(e) => warn!(error = %e, "update fetch failed, keeping cadence"),
        }
    }

    /// Run forever at the configured cadence. Never returns; stopping the
    /// loop means dropping its task.
    pub async fn run(mut self) {
        loop {
            tokio::time::sleep(self.interval).await;
            self.cycle().await;
        }
    }
}
