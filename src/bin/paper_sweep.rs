//! paper-sweep — 会议论文批量摘要命令行工具
//!
//! Usage:
//!   paper-sweep run <plan.yaml>              Harvest, summarize and export per conference
//!   paper-sweep titles <url> [--filter <s>]  Print harvested titles from one listing page
//!   paper-sweep version                      Show version information

use anyhow::{Context, Result};
use paper_sweep::dispatch::{SweepConfig, SweepRunner};
use paper_sweep::export;
use paper_sweep::extract::FencedJsonProcessor;
use paper_sweep::harvest::{Conference, TitleHarvester};
use paper_sweep::progress::ConsoleProgressSink;
use paper_sweep::survey::{summary_schema, Paper};
use paper_sweep::transport::HttpChatService;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "run" => cmd_run(&args[2..]).await,
        "titles" => cmd_titles(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"paper-sweep — batch summarization of conference papers

USAGE:
    paper-sweep <COMMAND> [OPTIONS]

COMMANDS:
    run <plan.yaml>                Harvest titles, summarize them, export one
                                   JSONL file per conference
    titles <url> [--filter <s>]    Print harvested titles from a listing page
    version                        Show version information
    help                           Show this help message

ENVIRONMENT:
    OPENAI_API_KEY                 API key for the completion endpoint
    SWEEP_MAX_INFLIGHT             Override the in-flight call pool size
    SWEEP_CALL_TIMEOUT_SECS        Override the per-call deadline
    SWEEP_MAX_ROUNDS               Override the retry round limit
    RUST_LOG                       Log filter (e.g. paper_sweep=debug)"#
    );
}

fn cmd_version() {
    println!("paper-sweep {}", env!("CARGO_PKG_VERSION"));
}

/// One survey: which conferences to harvest, what to filter for, and how hard
/// to push the completion endpoint.
#[derive(Debug, Deserialize)]
struct SurveyPlan {
    model: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    filter: String,
    #[serde(default = "default_output_dir")]
    output_dir: String,
    #[serde(default)]
    max_inflight: Option<usize>,
    #[serde(default)]
    call_timeout_secs: Option<u64>,
    #[serde(default)]
    max_rounds: Option<u32>,
    conferences: Vec<PlannedConference>,
}

#[derive(Debug, Deserialize)]
struct PlannedConference {
    name: String,
    url: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl SurveyPlan {
    fn sweep_config(&self) -> SweepConfig {
        let mut config = SweepConfig::new();
        if let Some(n) = self.max_inflight {
            config = config.with_max_inflight(n);
        }
        if let Some(secs) = self.call_timeout_secs {
            config = config.with_call_timeout(Duration::from_secs(secs));
        }
        if let Some(rounds) = self.max_rounds {
            config = config.with_max_rounds(rounds);
        }
        config
    }
}

async fn cmd_run(args: &[String]) -> Result<()> {
    if args.is_empty() {
        eprintln!("Usage: paper-sweep run <plan.yaml>");
        std::process::exit(1);
    }
    let plan_path = &args[0];
    let raw = std::fs::read_to_string(plan_path)
        .with_context(|| format!("reading plan {plan_path}"))?;
    let plan: SurveyPlan =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing plan {plan_path}"))?;
    if plan.conferences.is_empty() {
        anyhow::bail!("plan lists no conferences");
    }

    std::fs::create_dir_all(&plan.output_dir)
        .with_context(|| format!("creating output directory {}", plan.output_dir))?;

    let service = HttpChatService::new(&plan.base_url, &plan.model)?;
    let processor = FencedJsonProcessor::with_schema(&summary_schema()?)?;
    let runner = SweepRunner::builder(Arc::new(service))
        .with_config(plan.sweep_config())
        .with_processor(Arc::new(processor))
        .with_progress(Arc::new(ConsoleProgressSink::default()))
        .build();
    let harvester = TitleHarvester::new()?;

    for planned in &plan.conferences {
        let conference = Conference::new(&planned.name, &planned.url)?;
        let titles = harvester.fetch_titles(&conference, &plan.filter).await?;
        println!(
            "{}: {} matching title(s) harvested",
            conference.name,
            titles.len()
        );
        if titles.is_empty() {
            continue;
        }

        let papers: Vec<Paper> = titles.into_iter().map(Paper::new).collect();
        let report = runner.process(&papers).await?;

        let records: Vec<serde_json::Value> =
            report.successes.iter().map(|(_, v)| v.clone()).collect();
        let path = export::export_summaries(&plan.output_dir, &conference.name, &records)?;
        println!(
            "{}: {}/{} paper(s) summarized ({:.0}% success) in {} round(s) -> {}",
            conference.name,
            report.success_count(),
            report.total_items,
            report.success_rate() * 100.0,
            report.rounds,
            path.display()
        );
    }
    Ok(())
}

async fn cmd_titles(args: &[String]) -> Result<()> {
    if args.is_empty() {
        eprintln!("Usage: paper-sweep titles <url> [--filter <substring>]");
        std::process::exit(1);
    }
    let url = &args[0];
    let filter = flag_value(&args[1..], "--filter").unwrap_or_default();

    let conference = Conference::new("listing", url)?;
    let harvester = TitleHarvester::new()?;
    let titles = harvester.fetch_titles(&conference, &filter).await?;
    for title in &titles {
        println!("{title}");
    }
    println!("\nTotal: {} title(s)", titles.len());
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if arg == flag {
            if let Some(v) = args.get(i + 1) {
                return Some(v.clone());
            }
        }
    }
    None
}
