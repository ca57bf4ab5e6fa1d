//! Integration tests for the round loop: retry partitioning, pool ceiling,
//! quota-driven pauses, fatal aborts, and give-up reporting.

use async_trait::async_trait;
use paper_sweep::dispatch::{SweepConfig, SweepRunner};
use paper_sweep::progress::{InMemoryProgressSink, ProgressEvent};
use paper_sweep::quota::QuotaHints;
use paper_sweep::transport::{ChatExchange, CompletionService};
use paper_sweep::types::message::Prompt;
use paper_sweep::types::work::WorkItem;
use paper_sweep::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;

struct TestItem(String);

impl TestItem {
    fn batch(titles: &[&str]) -> Vec<TestItem> {
        titles.iter().map(|t| TestItem(t.to_string())).collect()
    }
}

impl WorkItem for TestItem {
    fn title(&self) -> &str {
        &self.0
    }
    fn prompt(&self) -> Prompt {
        Prompt::new("test", self.0.clone())
    }
}

fn ok_hints() -> QuotaHints {
    QuotaHints::new(4999, 59_999, "0s", "0s")
}

fn fenced(title: &str) -> String {
    format!("```json\n{{\"title\": \"{title}\"}}\n```")
}

fn exchange(content: String, quota: QuotaHints) -> Result<ChatExchange> {
    Ok(ChatExchange { content, quota })
}

/// Fails each item's first `succeed_on - 1` attempts with unparseable text.
struct FlakyService {
    succeed_on: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl FlakyService {
    fn new(succeed_on: u32) -> Self {
        Self {
            succeed_on,
            counts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CompletionService for FlakyService {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let attempt = {
            let mut counts = self.counts.lock().unwrap();
            let c = counts.entry(prompt.user.clone()).or_insert(0);
            *c += 1;
            *c
        };
        let content = if attempt >= self.succeed_on {
            fenced(&prompt.user)
        } else {
            "I refuse to emit JSON.".to_string()
        };
        exchange(content, ok_hints())
    }
}

/// Never produces a parseable payload.
struct AlwaysGarbled;

#[async_trait]
impl CompletionService for AlwaysGarbled {
    async fn complete(&self, _prompt: &Prompt) -> Result<ChatExchange> {
        exchange("nope".to_string(), ok_hints())
    }
}

/// Reports a reset hint in a unit the provider never documented.
struct PoisonQuota;

#[async_trait]
impl CompletionService for PoisonQuota {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        exchange(
            fenced(&prompt.user),
            QuotaHints::new(4999, 59_999, "6m0s", "1s"),
        )
    }
}

/// Tracks how many calls overlap.
struct GaugeService {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeService {
    fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionService for GaugeService {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        exchange(fenced(&prompt.user), ok_hints())
    }
}

#[tokio::test]
async fn test_retryable_failures_recover_on_second_round() {
    let sink = Arc::new(InMemoryProgressSink::new());
    let runner = SweepRunner::builder(Arc::new(FlakyService::new(2)))
        .with_progress(sink.clone())
        .build();

    let items = TestItem::batch(&["A", "B", "C"]);
    let report = runner.process(&items).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.success_count(), 3);
    assert_eq!(report.rounds, 2);

    let retries = sink
        .events()
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ItemRetrying { .. }))
        .count();
    assert_eq!(retries, 3);

    let rounds: Vec<(u32, usize)> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::RoundStarted { round, pending } => Some((*round, *pending)),
            _ => None,
        })
        .collect();
    assert_eq!(rounds, vec![(1, 3), (2, 3)]);
}

#[tokio::test]
async fn test_items_exhaust_rounds_and_are_reported() {
    let sink = Arc::new(InMemoryProgressSink::new());
    let runner = SweepRunner::builder(Arc::new(AlwaysGarbled))
        .with_progress(sink.clone())
        .build();

    let items = TestItem::batch(&["Stubborn One", "Stubborn Two"]);
    let report = runner.process(&items).await.unwrap();

    assert_eq!(report.rounds, 3);
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.failure_count(), 2);
    for (_, err) in &report.failures {
        assert!(matches!(err, Error::Parse(_)));
    }

    let mut abandoned = sink.abandoned_titles();
    abandoned.sort();
    assert_eq!(abandoned, vec!["Stubborn One", "Stubborn Two"]);
}

#[tokio::test]
async fn test_uninterpretable_reset_hint_aborts_sweep() {
    let sink = Arc::new(InMemoryProgressSink::new());
    let runner = SweepRunner::builder(Arc::new(PoisonQuota))
        .with_progress(sink.clone())
        .build();

    let items = TestItem::batch(&["A", "B", "C"]);
    let err = runner.process(&items).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(!err.is_retryable());
    // Aborted, not abandoned: nothing exhausted its rounds.
    assert!(sink.abandoned_titles().is_empty());
}

#[tokio::test]
async fn test_pool_ceiling_is_respected() {
    let service = Arc::new(GaugeService::new());
    let runner = SweepRunner::builder(service.clone())
        .with_config(SweepConfig::new().with_max_inflight(2))
        .build();

    let titles: Vec<String> = (0..10).map(|i| format!("Paper {i}")).collect();
    let items: Vec<TestItem> = titles.iter().map(|t| TestItem(t.clone())).collect();
    let report = runner.process(&items).await.unwrap();

    assert!(report.all_succeeded());
    assert!(service.peak.load(Ordering::SeqCst) <= 2);
}

/// Stalls the first attempt for the named titles past the deadline; every
/// other call answers immediately.
struct SlowFirstAttempt {
    stalled: Vec<String>,
    counts: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl CompletionService for SlowFirstAttempt {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let attempt = {
            let mut counts = self.counts.lock().unwrap();
            let c = counts.entry(prompt.user.clone()).or_insert(0);
            *c += 1;
            *c
        };
        if attempt == 1 && self.stalled.contains(&prompt.user) {
            sleep(Duration::from_millis(200)).await;
        }
        exchange(fenced(&prompt.user), ok_hints())
    }
}

#[tokio::test]
async fn test_two_timeouts_recover_without_disturbing_siblings() {
    let titles: Vec<String> = (0..10).map(|i| format!("Paper {i}")).collect();
    let runner = SweepRunner::builder(Arc::new(SlowFirstAttempt {
        stalled: vec!["Paper 3".to_string(), "Paper 7".to_string()],
        counts: Mutex::new(HashMap::new()),
    }))
    .with_config(
        SweepConfig::new()
            .with_max_inflight(2)
            .with_call_timeout(Duration::from_millis(60)),
    )
    .build();

    let items: Vec<TestItem> = titles.iter().map(|t| TestItem(t.clone())).collect();
    let report = runner.process(&items).await.unwrap();

    assert_eq!(report.success_count(), 10);
    assert!(report.all_succeeded());
    assert_eq!(report.rounds, 2);
}

/// First response reports a nearly-spent request budget with an 80ms cooldown;
/// the following call must pause at least that long before going out.
struct ThrottleScript {
    starts: Mutex<Vec<Instant>>,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for ThrottleScript {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        self.starts.lock().unwrap().push(Instant::now());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let quota = if n == 0 {
            QuotaHints::new(3, 50_000, "80ms", "10ms")
        } else {
            ok_hints()
        };
        exchange(fenced(&prompt.user), quota)
    }
}

#[tokio::test]
async fn test_thin_budget_pauses_the_next_call() {
    let service = Arc::new(ThrottleScript {
        starts: Mutex::new(Vec::new()),
        calls: AtomicUsize::new(0),
    });
    let runner = SweepRunner::builder(service.clone())
        .with_config(SweepConfig::new().with_max_inflight(1))
        .build();

    let items = TestItem::batch(&["first", "second"]);
    let report = runner.process(&items).await.unwrap();
    assert!(report.all_succeeded());

    let starts = service.starts.lock().unwrap();
    assert_eq!(starts.len(), 2);
    assert!(starts[1] - starts[0] >= Duration::from_millis(80));

    let snapshot = runner.quota_snapshot().await;
    assert_eq!(snapshot.remaining_requests, 4999);
}

/// Sleeps far past the per-call deadline.
struct NeverAnswers;

#[async_trait]
impl CompletionService for NeverAnswers {
    async fn complete(&self, _prompt: &Prompt) -> Result<ChatExchange> {
        sleep(Duration::from_secs(5)).await;
        exchange("unreachable".to_string(), ok_hints())
    }
}

#[tokio::test]
async fn test_timed_out_call_leaves_quota_untouched() {
    let runner = SweepRunner::builder(Arc::new(NeverAnswers))
        .with_config(
            SweepConfig::new()
                .with_call_timeout(Duration::from_millis(30))
                .with_max_rounds(1),
        )
        .build();

    let items = TestItem::batch(&["doomed"]);
    let report = runner.process(&items).await.unwrap();

    assert_eq!(report.failure_count(), 1);
    assert!(matches!(report.failures[0].1, Error::Timeout(_)));

    let snapshot = runner.quota_snapshot().await;
    assert_eq!(snapshot.remaining_requests, 5000);
    assert_eq!(snapshot.remaining_tokens, 60_000);
    assert_eq!(snapshot.cooldown, Duration::ZERO);
}

/// Hands out a different budget on each call.
struct BudgetSequence {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for BudgetSequence {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let quota = if n == 0 {
            QuotaHints::new(1000, 50_000, "1s", "2s")
        } else {
            QuotaHints::new(999, 49_000, "3s", "1s")
        };
        exchange(fenced(&prompt.user), quota)
    }
}

#[tokio::test]
async fn test_tracker_holds_last_completed_call() {
    let runner = SweepRunner::builder(Arc::new(BudgetSequence {
        calls: AtomicUsize::new(0),
    }))
    .with_config(SweepConfig::new().with_max_inflight(1))
    .build();

    let items = TestItem::batch(&["one", "two"]);
    runner.process(&items).await.unwrap();

    let snapshot = runner.quota_snapshot().await;
    assert_eq!(snapshot.remaining_requests, 999);
    assert_eq!(snapshot.remaining_tokens, 49_000);
    assert_eq!(snapshot.cooldown, Duration::from_secs(3));
}

/// Answers each title after its scripted delay.
struct DelayPerTitle {
    delays: HashMap<String, u64>,
}

#[async_trait]
impl CompletionService for DelayPerTitle {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let millis = self.delays.get(&prompt.user).copied().unwrap_or(0);
        sleep(Duration::from_millis(millis)).await;
        exchange(fenced(&prompt.user), ok_hints())
    }
}

#[tokio::test]
async fn test_successes_arrive_in_completion_order() {
    let delays = HashMap::from([("slow".to_string(), 80u64), ("fast".to_string(), 10u64)]);
    let runner = SweepRunner::builder(Arc::new(DelayPerTitle { delays })).build();

    let items = TestItem::batch(&["slow", "fast"]);
    let report = runner.process(&items).await.unwrap();

    assert_eq!(report.success_count(), 2);
    // "fast" (input index 1) finished first.
    assert_eq!(report.successes[0].0, 1);
    assert_eq!(report.successes[0].1["title"], "fast");
    assert_eq!(report.successes[1].0, 0);
}

/// One title is permanently garbled, the rest summarize cleanly.
struct OneBadApple;

#[async_trait]
impl CompletionService for OneBadApple {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange> {
        let content = if prompt.user == "bad" {
            "still not JSON".to_string()
        } else {
            fenced(&prompt.user)
        };
        exchange(content, ok_hints())
    }
}

#[tokio::test]
async fn test_partition_keeps_good_items_out_of_retry() {
    let sink = Arc::new(InMemoryProgressSink::new());
    let runner = SweepRunner::builder(Arc::new(OneBadApple))
        .with_progress(sink.clone())
        .build();

    let items = TestItem::batch(&["good", "bad"]);
    let report = runner.process(&items).await.unwrap();

    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.success_rate(), 0.5);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.successes[0].0, 0);
    assert_eq!(report.failures[0].0, 1);

    // Only the bad item re-enters later rounds.
    let later_rounds: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::RoundStarted { round, pending } if *round > 1 => Some(*pending),
            _ => None,
        })
        .collect();
    assert_eq!(later_rounds, vec![1, 1]);
}

#[tokio::test]
async fn test_empty_batch_is_a_clean_noop() {
    let sink = Arc::new(InMemoryProgressSink::new());
    let runner = SweepRunner::builder(Arc::new(AlwaysGarbled))
        .with_progress(sink.clone())
        .build();

    let items: Vec<TestItem> = Vec::new();
    let report = runner.process(&items).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.rounds, 0);
    assert_eq!(report.total_items, 0);
    assert_eq!(report.success_rate(), 0.0);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ProgressEvent::SweepFinished { .. }));
}
