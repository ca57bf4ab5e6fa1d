//! Single-attempt dispatch against the completion service.
//!
//! One call attempt is: take a slot from the in-flight pool, pause if the
//! tracked quota is thin, run the call under a deadline, absorb the quota the
//! response reported, then hand the text to the result processor. The slot is
//! held for the entire attempt, pause included, so a throttled sweep cannot
//! pile new calls onto a provider that just told us to slow down.

use crate::extract::ResultProcessor;
use crate::quota::QuotaTracker;
use crate::transport::CompletionService;
use crate::types::work::WorkItem;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::config::SweepConfig;

/// Executes single call attempts under the shared pool and quota tracker.
pub struct Dispatcher {
    service: Arc<dyn CompletionService>,
    processor: Arc<dyn ResultProcessor>,
    quota: Arc<QuotaTracker>,
    slots: Semaphore,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        service: Arc<dyn CompletionService>,
        processor: Arc<dyn ResultProcessor>,
        quota: Arc<QuotaTracker>,
        config: &SweepConfig,
    ) -> Self {
        Self {
            service,
            processor,
            quota,
            slots: Semaphore::new(config.max_inflight),
            call_timeout: config.call_timeout,
        }
    }

    /// The quota tracker this dispatcher updates. Shared for the whole sweep.
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Runs one attempt for `item` and returns its structured payload.
    ///
    /// Every failure mode comes back as a typed [`Error`]; retryable ones are
    /// the caller's cue to re-dispatch on a later round, while
    /// [`Error::Config`] means the provider reported something we cannot
    /// interpret and the whole sweep should stop.
    pub async fn dispatch(&self, item: &dyn WorkItem) -> Result<Value> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| Error::internal("dispatch semaphore closed"))?;

        // Throttle check happens after the slot is taken: a paused attempt
        // keeps its slot so the pool drains instead of refilling.
        if let Some(pause) = self.quota.throttle_hint().await {
            debug!(
                title = item.title(),
                wait_ms = pause.as_millis() as u64,
                "budget thin, pausing before call"
            );
            sleep(pause).await;
        }

        let call_id = uuid::Uuid::new_v4();
        debug!(%call_id, title = item.title(), "dispatching completion call");

        let prompt = item.prompt();
        let exchange = match timeout(self.call_timeout, self.service.complete(&prompt)).await {
            Ok(outcome) => outcome?,
            Err(_) => return Err(Error::Timeout(self.call_timeout)),
        };

        // The reply counted against the budget whether or not we can use it,
        // so the quota is absorbed before the payload is inspected.
        self.quota.absorb(&exchange.quota).await?;

        self.processor.process(&exchange.content)
    }
}
