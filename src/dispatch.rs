//! 批量派发模块：在配额和并发上限内调度批量补全请求，并做有界重试。
//!
//! # Batch Dispatch Module
//!
//! This module is the heart of the crate: it pushes a batch of work items
//! through a completion service while honoring the provider's server-reported
//! quota, a bounded in-flight pool, and a bounded number of retry rounds.
//!
//! ## Overview
//!
//! Dispatch happens in two layers:
//! - [`Dispatcher`] runs a single call attempt: acquire a slot, pause if the
//!   quota is thin, call with a deadline, absorb the reported quota, parse.
//! - [`SweepRunner`] runs rounds: dispatch everything pending concurrently,
//!   collect outcomes in completion order, re-dispatch retryable failures,
//!   and give up after a fixed number of rounds.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`SweepConfig`] | Pool size, per-call deadline, round limit, quota thresholds |
//! | [`Dispatcher`] | Single-attempt execution against the completion service |
//! | [`SweepRunner`] | Round loop with retry partitioning and give-up reporting |
//! | [`SweepRunnerBuilder`] | Fluent construction with env overrides |
//! | [`SweepReport`] | Indexed successes and permanent failures, plus round count |
//!
//! ## Example
//!
//! ```rust,no_run
//! use paper_sweep::{SweepConfig, SweepRunner};
//! use paper_sweep::transport::HttpChatService;
//! use paper_sweep::survey::Paper;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> paper_sweep::Result<()> {
//! let service = Arc::new(HttpChatService::new("https://api.openai.com/v1", "gpt-4o")?);
//! let runner = SweepRunner::builder(service)
//!     .with_config(SweepConfig::new().with_max_inflight(8).with_call_timeout(Duration::from_secs(60)))
//!     .build();
//!
//! let papers = vec![Paper::new("Emergent Tool Use From Multi-Agent Autocurricula")];
//! let report = runner.process(&papers).await?;
//! println!("{} summarized over {} rounds", report.success_count(), report.rounds);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod rounds;

pub use config::SweepConfig;
pub use dispatcher::Dispatcher;
pub use rounds::{SweepReport, SweepRunner, SweepRunnerBuilder};
