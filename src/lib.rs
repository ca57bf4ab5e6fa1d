//! # paper-sweep
//!
//! 配额感知的并发批量摘要引擎：在速率受限的 LLM 推理 API 上批量执行论文摘要任务。
//!
//! Quota-aware concurrent batch summarization over rate-limited LLM inference
//! APIs, plus the collaborators that turn it into a paper-survey pipeline.
//!
//! ## Overview
//!
//! The core of this library drives a large set of independent chat completions
//! through a bounded concurrency pool while honoring the quota the server
//! reports back on every response. Failed calls never escape as panics; they
//! collapse into a closed set of typed outcomes that a bounded retry loop
//! re-dispatches for up to a fixed number of rounds.
//!
//! Around that core sit the survey collaborators: harvesting paper titles from
//! conference listing pages, templating the summarization prompt, validating
//! the structured reply against a schema, and exporting the collected
//! summaries as JSONL.
//!
//! ## Key Features
//!
//! - **Bounded dispatch**: a semaphore pool (default 50) gates in-flight calls
//! - **Proactive throttling**: server-reported remaining requests/tokens and
//!   reset hints pause dispatch before the provider starts rejecting
//! - **Typed outcomes**: [`Error`] partitions every failure into retryable
//!   (timeout, transport, API, parse) and fatal (configuration) kinds
//! - **Bounded rounds**: [`SweepRunner`] retries failed items for at most a
//!   configured number of rounds and reports what it gave up on
//! - **Pluggable seams**: [`CompletionService`], [`ResultProcessor`],
//!   [`ProgressSink`] and the harvest-side [`harvest::TitleExtractor`] are all
//!   trait objects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paper_sweep::{HttpChatService, Paper, SweepRunner};
//!
//! #[tokio::main]
//! async fn main() -> paper_sweep::Result<()> {
//!     let service = Arc::new(HttpChatService::new("https://api.openai.com/v1", "gpt-4o")?);
//!     let runner = SweepRunner::builder(service).build();
//!
//!     let papers = vec![
//!         Paper::new("Cooperative Exploration Under Partial Observability"),
//!         Paper::new("Credit Assignment in Large Agent Populations"),
//!     ];
//!
//!     let report = runner.process(&papers).await?;
//!     println!(
//!         "{} summaries collected, {} papers failed after {} rounds",
//!         report.success_count(),
//!         report.failure_count(),
//!         report.rounds
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`quota`] | Server-reported quota state, thresholds and reset-hint parsing |
//! | [`dispatch`] | Bounded call dispatch and the round-based sweep runner |
//! | [`transport`] | Completion-service seam and the reqwest-backed implementation |
//! | [`extract`] | Fenced-payload extraction and schema validation |
//! | [`types`] | Messages, prompts and the work-item seam |
//! | [`survey`] | Paper work items, the survey prompt and the summary record |
//! | [`harvest`] | Conference listing scraping and title filtering |
//! | [`export`] | JSONL export of collected summaries |
//! | [`progress`] | Pluggable progress and diagnostic event channel |

pub mod dispatch;
pub mod export;
pub mod extract;
pub mod harvest;
pub mod progress;
pub mod quota;
pub mod survey;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use dispatch::{Dispatcher, SweepConfig, SweepReport, SweepRunner, SweepRunnerBuilder};
pub use extract::{FencedJsonProcessor, ResultProcessor};
pub use progress::{ProgressEvent, ProgressSink};
pub use quota::{QuotaConfig, QuotaHints, QuotaSnapshot, QuotaTracker};
pub use survey::{Paper, PaperSummary};
pub use transport::{ChatExchange, CompletionService, HttpChatService};
pub use types::{
    message::{Message, MessageRole, Prompt},
    work::WorkItem,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
