//! Survey Run Example
//!
//! End-to-end survey against live endpoints: harvests NeurIPS 2023 titles
//! matching "multi-agent", summarizes the first ten with the configured
//! model, and exports one JSONL file under `summaries/`.
//!
//! Requires OPENAI_API_KEY and network access to neurips.cc and
//! api.openai.com.
//!
//! Usage:
//!   OPENAI_API_KEY=sk-... cargo run --example survey_run

use paper_sweep::dispatch::{SweepConfig, SweepRunner};
use paper_sweep::export::export_summaries;
use paper_sweep::extract::FencedJsonProcessor;
use paper_sweep::harvest::{Conference, TitleHarvester};
use paper_sweep::progress::ConsoleProgressSink;
use paper_sweep::survey::{summary_schema, Paper};
use paper_sweep::transport::HttpChatService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("paper_sweep=debug")
        .init();

    println!("=== paper-sweep Survey Demo ===\n");

    let conference = Conference::new(
        "NeurIPS_2023",
        "https://neurips.cc/virtual/2023/papers.html?filter=titles",
    )?;
    let harvester = TitleHarvester::new()?;
    let mut titles = harvester.fetch_titles(&conference, "multi-agent").await?;
    println!("{} matching titles at {}", titles.len(), conference.name);
    titles.truncate(10);

    let papers: Vec<Paper> = titles.into_iter().map(Paper::new).collect();

    let service = HttpChatService::new("https://api.openai.com/v1", "gpt-4o")?;
    let processor = FencedJsonProcessor::with_schema(&summary_schema()?)?;
    let runner = SweepRunner::builder(Arc::new(service))
        .with_config(SweepConfig::new().with_max_inflight(5))
        .with_processor(Arc::new(processor))
        .with_progress(Arc::new(ConsoleProgressSink::default()))
        .build();

    let report = runner.process(&papers).await?;

    let records: Vec<serde_json::Value> =
        report.successes.iter().map(|(_, v)| v.clone()).collect();
    std::fs::create_dir_all("summaries")?;
    let path = export_summaries("summaries", &conference.name, &records)?;

    println!(
        "\n{}/{} summarized in {} round(s) -> {}",
        report.success_count(),
        report.total_items,
        report.rounds,
        path.display()
    );
    for (idx, err) in &report.failures {
        println!("gave up on {:?}: {err}", papers[*idx].title);
    }

    Ok(())
}
