//! Round loop: bounded retries over a batch of work items.
//!
//! Each round dispatches everything still pending at full concurrency and
//! consumes outcomes in completion order. Retryable failures go back on the
//! pending list for the next round; a fatal error aborts the sweep and drops
//! whatever is still in flight. Items that survive every round unsummarized
//! are reported to the progress sink and listed in the final report.

use crate::extract::{FencedJsonProcessor, ResultProcessor};
use crate::progress::{noop_sink, ProgressEvent, ProgressSink};
use crate::quota::{QuotaSnapshot, QuotaTracker};
use crate::transport::CompletionService;
use crate::types::work::WorkItem;
use crate::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::config::SweepConfig;
use super::dispatcher::Dispatcher;

/// Outcome of a sweep: indexed payloads, permanent failures, and how many
/// rounds it took.
#[derive(Debug)]
pub struct SweepReport {
    /// `(input index, payload)` pairs in completion order.
    pub successes: Vec<(usize, Value)>,
    /// `(input index, last error)` for items abandoned after the final round.
    pub failures: Vec<(usize, Error)>,
    /// Rounds actually executed.
    pub rounds: u32,
    pub total_items: usize,
    pub execution_time: Duration,
}

impl SweepReport {
    pub fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            rounds: 0,
            total_items: 0,
            execution_time: Duration::ZERO,
        }
    }
    pub fn add_success(&mut self, i: usize, payload: Value) {
        self.successes.push((i, payload));
    }
    pub fn add_failure(&mut self, i: usize, e: Error) {
        self.failures.push((i, e));
    }
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            self.successes.len() as f64 / self.total_items as f64
        }
    }
}

impl Default for SweepReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a batch through bounded retry rounds.
pub struct SweepRunner {
    dispatcher: Dispatcher,
    max_rounds: u32,
    progress: Arc<dyn ProgressSink>,
}

impl SweepRunner {
    pub fn builder(service: Arc<dyn CompletionService>) -> SweepRunnerBuilder {
        SweepRunnerBuilder::new(service)
    }

    /// Current view of the provider budget this runner is tracking.
    pub async fn quota_snapshot(&self) -> QuotaSnapshot {
        self.dispatcher.quota().snapshot().await
    }

    /// Sweeps `items`: dispatches everything, retries what failed with a
    /// retryable error, and gives up after the configured number of rounds.
    ///
    /// Returns `Err` only for fatal errors ([`Error::Config`] from an
    /// uninterpretable quota report, or an internal fault); per-item failures
    /// land in the report instead.
    pub async fn process<W: WorkItem>(&self, items: &[W]) -> Result<SweepReport> {
        let sweep_id = uuid::Uuid::new_v4();
        let start = Instant::now();
        let mut report = SweepReport::new();
        report.total_items = items.len();

        let mut pending: Vec<usize> = (0..items.len()).collect();
        let mut last_errors: Vec<Option<Error>> = (0..items.len()).map(|_| None).collect();
        let mut round = 0u32;

        debug!(
            %sweep_id,
            items = items.len(),
            max_rounds = self.max_rounds,
            "sweep started"
        );

        while !pending.is_empty() && round < self.max_rounds {
            round += 1;
            let _ = self
                .progress
                .report(ProgressEvent::RoundStarted {
                    round,
                    pending: pending.len(),
                })
                .await;
            info!(%sweep_id, round, pending = pending.len(), "dispatching round");

            let mut inflight = FuturesUnordered::new();
            for idx in pending.drain(..) {
                let item = &items[idx];
                inflight.push(async move { (idx, self.dispatcher.dispatch(item).await) });
            }

            let mut retry = Vec::new();
            while let Some((idx, outcome)) = inflight.next().await {
                match outcome {
                    Ok(payload) => {
                        let _ = self
                            .progress
                            .report(ProgressEvent::ItemCompleted {
                                title: items[idx].title().to_string(),
                                round,
                            })
                            .await;
                        report.add_success(idx, payload);
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(
                            %sweep_id,
                            round,
                            title = items[idx].title(),
                            error = %e,
                            "call failed, will re-dispatch"
                        );
                        let _ = self
                            .progress
                            .report(ProgressEvent::ItemRetrying {
                                title: items[idx].title().to_string(),
                                round,
                                reason: e.to_string(),
                            })
                            .await;
                        last_errors[idx] = Some(e);
                        retry.push(idx);
                    }
                    Err(e) => {
                        error!(
                            %sweep_id,
                            round,
                            title = items[idx].title(),
                            error = %e,
                            "fatal error, aborting sweep"
                        );
                        return Err(e);
                    }
                }
            }
            pending = retry;
        }

        for idx in pending {
            let err = last_errors[idx]
                .take()
                .unwrap_or_else(|| Error::internal("item was never dispatched"));
            let reason = err.to_string();
            warn!(%sweep_id, title = items[idx].title(), reason = %reason, "giving up on item");
            let _ = self
                .progress
                .report(ProgressEvent::ItemAbandoned {
                    title: items[idx].title().to_string(),
                    reason,
                })
                .await;
            report.add_failure(idx, err);
        }

        report.rounds = round;
        report.execution_time = start.elapsed();
        let _ = self
            .progress
            .report(ProgressEvent::SweepFinished {
                succeeded: report.success_count(),
                failed: report.failure_count(),
                rounds: round,
            })
            .await;
        info!(
            %sweep_id,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            rounds = round,
            "sweep finished"
        );
        Ok(report)
    }
}

/// Fluent construction for [`SweepRunner`].
pub struct SweepRunnerBuilder {
    service: Arc<dyn CompletionService>,
    config: SweepConfig,
    processor: Arc<dyn ResultProcessor>,
    progress: Arc<dyn ProgressSink>,
}

impl SweepRunnerBuilder {
    fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            config: SweepConfig::default(),
            processor: Arc::new(FencedJsonProcessor::new()),
            progress: noop_sink(),
        }
    }
    pub fn with_config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }
    pub fn with_processor(mut self, processor: Arc<dyn ResultProcessor>) -> Self {
        self.processor = processor;
        self
    }
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }
    pub fn build(self) -> SweepRunner {
        let config = self.config.overridden_from_env();
        let quota = Arc::new(QuotaTracker::new(config.quota.clone()));
        let dispatcher = Dispatcher::new(self.service, self.processor, quota, &config);
        SweepRunner {
            dispatcher,
            max_rounds: config.max_rounds,
            progress: self.progress,
        }
    }
}
