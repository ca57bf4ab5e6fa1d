//! 进度反馈类型：提供 ProgressSink trait 和扫描过程中的各类进度事件。
//!
//! Progress reporting for long-running sweeps.
//!
//! Provides the [`ProgressSink`] trait, the [`ProgressEvent`] enum, and a set
//! of ready-made sinks. The runner never fails a sweep because a sink failed;
//! sink errors are swallowed at the call site.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Typed progress events emitted while a sweep runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// A retry round is about to dispatch `pending` items.
    RoundStarted { round: u32, pending: usize },
    /// An item produced a usable payload.
    ItemCompleted { title: String, round: u32 },
    /// An item failed with a retryable error and will be re-dispatched.
    ItemRetrying {
        title: String,
        round: u32,
        reason: String,
    },
    /// An item exhausted every round; its last error is attached.
    ItemAbandoned { title: String, reason: String },
    /// The sweep is over.
    SweepFinished {
        succeeded: usize,
        failed: usize,
        rounds: u32,
    },
}

impl ProgressEvent {
    /// The work-item title this event concerns, when it concerns one.
    pub fn title(&self) -> Option<&str> {
        match self {
            ProgressEvent::ItemCompleted { title, .. } => Some(title),
            ProgressEvent::ItemRetrying { title, .. } => Some(title),
            ProgressEvent::ItemAbandoned { title, .. } => Some(title),
            _ => None,
        }
    }
}

/// Progress sink trait.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, event: ProgressEvent) -> Result<()>;
}

/// No-op sink, the default when no sink is configured.
pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn report(&self, _: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

/// Returns a no-op progress sink.
pub fn noop_sink() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgressSink)
}

/// In-memory sink for testing.
pub struct InMemoryProgressSink {
    events: Arc<RwLock<Vec<ProgressEvent>>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().unwrap().clone()
    }
    /// Titles that were given up on, in the order they were reported.
    pub fn abandoned_titles(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::ItemAbandoned { title, .. } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<()> {
        self.events.write().unwrap().push(event);
        Ok(())
    }
}

/// Console sink for debugging.
pub struct ConsoleProgressSink {
    prefix: String,
}

impl ConsoleProgressSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for ConsoleProgressSink {
    fn default() -> Self {
        Self::new("[Sweep]")
    }
}

#[async_trait]
impl ProgressSink for ConsoleProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<()> {
        println!("{} {:?}", self.prefix, event);
        Ok(())
    }
}

/// Composite sink for multiple destinations. One sink failing never stops
/// delivery to the others.
pub struct CompositeProgressSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl CompositeProgressSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }
    pub fn add_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for CompositeProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressSink for CompositeProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<()> {
        for s in &self.sinks {
            let _ = s.report(event.clone()).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_records_in_order() {
        let sink = InMemoryProgressSink::new();
        sink.report(ProgressEvent::RoundStarted {
            round: 1,
            pending: 3,
        })
        .await
        .unwrap();
        sink.report(ProgressEvent::ItemCompleted {
            title: "A".into(),
            round: 1,
        })
        .await
        .unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::RoundStarted { .. }));
        assert_eq!(events[1].title(), Some("A"));
    }

    #[tokio::test]
    async fn test_abandoned_titles_filter() {
        let sink = InMemoryProgressSink::new();
        sink.report(ProgressEvent::ItemAbandoned {
            title: "B".into(),
            reason: "parse".into(),
        })
        .await
        .unwrap();
        sink.report(ProgressEvent::ItemCompleted {
            title: "A".into(),
            round: 2,
        })
        .await
        .unwrap();
        assert_eq!(sink.abandoned_titles(), vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn test_composite_delivers_to_all() {
        let a = Arc::new(InMemoryProgressSink::new());
        let b = Arc::new(InMemoryProgressSink::new());
        let composite = CompositeProgressSink::new()
            .add_sink(a.clone())
            .add_sink(b.clone());
        composite
            .report(ProgressEvent::SweepFinished {
                succeeded: 1,
                failed: 0,
                rounds: 1,
            })
            .await
            .unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
