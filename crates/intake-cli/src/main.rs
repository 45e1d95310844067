use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use intake_core::impls::InMemoryWorker;
use intake_core::{IntakeConfig, IntakeQueue, Submission};

/// Feed share submissions through an intake queue and hand them to a worker
/// that connects after a delay.
#[derive(Debug, Parser)]
#[command(name = "intake", version)]
struct Cli {
    /// TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raw JSON submission, e.g. '{"action":"single","extras":{"stream":"content://media/1"}}'
    #[arg(long = "json", value_name = "SUBMISSION")]
    json: Vec<String>,

    /// Override `connect_delay_ms` from the config
    #[arg(long, value_name = "MS")]
    connect_delay_ms: Option<u64>,

    /// Resource locators shared together as one multi-item submission
    uris: Vec<String>,
}

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_submissions(cli: &Cli) -> anyhow::Result<Vec<Submission>> {
    let mut submissions = Vec::new();
    for raw in &cli.json {
        let submission: Submission = serde_json::from_str(raw)
            .with_context(|| format!("parsing submission {raw:?}"))?;
        submissions.push(submission);
    }
    if !cli.uris.is_empty() {
        submissions.push(Submission::multiple(cli.uris.iter().cloned()));
    }
    Ok(submissions)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // (A) 設定とログ
    let mut config = match &cli.config {
        Some(path) => IntakeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IntakeConfig::default(),
    };
    if let Some(ms) = cli.connect_delay_ms {
        config.connect_delay_ms = ms;
    }
    setup_logging(&config.log_filter);

    // (B) queue と worker を用意（worker はまだ繋がない）
    let queue = IntakeQueue::builder().config(config.clone()).spawn()?;
    let worker = Arc::new(InMemoryWorker::new());

    // (C) submission を投入。解決できない payload はここで捨てる
    for submission in read_submissions(&cli)? {
        match queue.accept(&submission) {
            Ok(count) => info!(count, "submission accepted"),
            Err(e) => warn!(error = %e, "discarding submission"),
        }
    }
    info!(pending = queue.status().pending, "waiting for worker");

    // (D) session manager 役: 少し遅れて worker が繋がる
    let session = tokio::spawn({
        let queue = queue.clone();
        let worker = Arc::clone(&worker);
        let delay = Duration::from_millis(config.connect_delay_ms);
        async move {
            sleep(delay).await;
            queue.on_worker_connected(worker);
        }
    });
    session.await.context("session task panicked")?;
    anyhow::ensure!(
        queue.connection_state().is_connected(),
        "worker did not connect"
    );
    queue.flush().await;

    // (E) worker 側から status を返してみる
    worker.emit_upload_status(true);
    for item in worker.received() {
        worker.emit_log(&format!("queued {item}"));
    }
    worker.emit_upload_status(false);

    // (F) 後片付け
    queue.detach();
    queue.flush().await;
    println!("{}", serde_json::to_string_pretty(&queue.status())?);
    queue.shutdown().await;
    Ok(())
}
