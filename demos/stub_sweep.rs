//! Stub Sweep Example
//!
//! Runs a full sweep against an in-process completion service, no network or
//! API key required. Shows:
//! - bounded concurrency and retry rounds
//! - quota absorption and throttle pauses
//! - progress events on the console sink
//!
//! Usage:
//!   cargo run --example stub_sweep

use async_trait::async_trait;
use paper_sweep::dispatch::{SweepConfig, SweepRunner};
use paper_sweep::progress::ConsoleProgressSink;
use paper_sweep::quota::QuotaHints;
use paper_sweep::survey::Paper;
use paper_sweep::transport::{ChatExchange, CompletionService};
use paper_sweep::types::message::Prompt;
use paper_sweep::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Every fourth reply is prose instead of JSON, and the sixth reply reports a
/// nearly-spent request budget so the following calls pause.
struct FlakyStub {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for FlakyStub {
    async fn complete(&self, _prompt: &Prompt) -> Result<ChatExchange> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        let n = self.calls.fetch_add(1, Ordering::SeqCst);

        let content = if n % 4 == 3 {
            "Sorry, I'd rather chat about the weather.".to_string()
        } else {
            format!(
                "```json\n{{\"title\": \"Paper #{n}\", \"topic\": \"stubbing\", \
                 \"problem\": \"p\", \"solution\": \"s\", \"benchmarks\": \"b\", \
                 \"challenges\": \"c\"}}\n```"
            )
        };

        let quota = if n == 5 {
            QuotaHints::new(4, 59_000, "250ms", "100ms")
        } else {
            QuotaHints::new(5000 - n as u64, 58_000, "0s", "0s")
        };

        Ok(ChatExchange { content, quota })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== paper-sweep Stub Demo ===\n");

    let papers: Vec<Paper> = (1..=12)
        .map(|i| Paper::new(format!("Cooperative Exploration Study {i}")))
        .collect();
    println!("Sweeping {} papers, pool of 4, up to 3 rounds\n", papers.len());

    let runner = SweepRunner::builder(Arc::new(FlakyStub {
        calls: AtomicUsize::new(0),
    }))
    .with_config(
        SweepConfig::new()
            .with_max_inflight(4)
            .with_call_timeout(Duration::from_secs(5)),
    )
    .with_progress(Arc::new(ConsoleProgressSink::default()))
    .build();

    let report = runner.process(&papers).await?;

    println!("\n--- Report ---");
    println!(
        "Summarized: {}/{} in {} round(s), {:?}",
        report.success_count(),
        report.total_items,
        report.rounds,
        report.execution_time
    );
    let snapshot = runner.quota_snapshot().await;
    println!(
        "Provider budget as last reported: {} requests, {} tokens",
        snapshot.remaining_requests, snapshot.remaining_tokens
    );

    println!("\nFirst few payloads:");
    for (idx, payload) in report.successes.iter().take(3) {
        println!("  input #{idx}: {}", payload["title"]);
    }
    for (idx, err) in &report.failures {
        println!("  gave up on input #{idx}: {err}");
    }

    Ok(())
}
