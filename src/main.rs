//! Redirect bot classifier CLI.
//!
//! Replays JSON-lines request snapshots through the classifier and prints
//! one JSON verdict per line.

use anyhow::{Context, Result};
use clap::Parser;
use redirect_bot_filter::config::SinkKind;
use redirect_bot_filter::{BotClassifier, ClassifierConfig, RequestSnapshot};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "redirect-bot-filter")]
#[command(author, version, about = "Classify redirect hits as human clicks or bots")]
struct Args {
    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines file of request snapshots (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Append verdicts to this log file
    #[arg(long)]
    verdict_log: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries verdicts
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, &args.log_level);

    let mut config = match &args.config {
        Some(path) => ClassifierConfig::from_path(path)?,
        None => ClassifierConfig::default(),
    };
    if let Some(path) = args.verdict_log {
        config.verdict_log.sink = SinkKind::File;
        config.verdict_log.path = path;
    }

    let classifier = BotClassifier::from_config(config).await?;

    let processed = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening input {}", path.display()))?;
            replay(&classifier, BufReader::new(file)).await?
        }
        None => replay(&classifier, BufReader::new(tokio::io::stdin())).await?,
    };

    info!(requests = processed, "Replay complete");
    classifier.shutdown().await;

    Ok(())
}

/// Classify every snapshot line from `reader`, writing verdicts to stdout.
async fn replay<R>(classifier: &BotClassifier, reader: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stdout = tokio::io::stdout();
    let mut processed = 0;
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let snapshot: RequestSnapshot = match serde_json::from_str(&line) {
            Ok(s) => s,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unparseable snapshot");
                continue;
            }
        };

        let verdict = classifier.classify(&snapshot.into_signals());
        let mut out = serde_json::to_vec(&verdict)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        processed += 1;
    }

    stdout.flush().await?;
    Ok(processed)
}
