//! Operational log of verdicts.
//!
//! Recording a verdict never blocks and never fails: the file sink hands
//! lines to a background writer over a bounded channel, and anything that
//! cannot be queued or written is emitted as a tracing event instead.

use crate::config::{SinkKind, VerdictLogConfig};
use crate::score::Verdict;
use crate::signals::RequestSignals;
use anyhow::Context;
use chrono::NaiveDateTime;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Destination for verdict log entries.
pub trait VerdictSink: Send + Sync {
    /// Record a verdict. Must not block or panic.
    fn record(&self, signals: &RequestSignals, verdict: &Verdict);

    /// Get the sink name.
    fn name(&self) -> &'static str;
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub is_bot: bool,
    pub reason: String,
    pub score: Option<i64>,
    pub client_ip: Option<IpAddr>,
    pub has_referer: bool,
    /// Truncated User-Agent, `None` when it was empty
    pub user_agent: Option<String>,
}

impl LogEntry {
    /// Build an entry stamped with the current local time.
    pub fn new(signals: &RequestSignals, verdict: &Verdict, ua_max_chars: usize) -> Self {
        Self::at(chrono::Local::now().naive_local(), signals, verdict, ua_max_chars)
    }

    pub fn at(
        timestamp: NaiveDateTime,
        signals: &RequestSignals,
        verdict: &Verdict,
        ua_max_chars: usize,
    ) -> Self {
        let ua = signals.user_agent();
        Self {
            timestamp,
            is_bot: verdict.is_bot,
            reason: verdict.reason.clone(),
            score: verdict.final_score,
            client_ip: signals.client_ip(),
            has_referer: signals.has_header("referer"),
            user_agent: (!ua.is_empty()).then(|| ua.chars().take(ua_max_chars).collect()),
        }
    }

    /// Render as a single line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} | {} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            if self.is_bot { "BOT" } else { "HUMAN" },
            self.reason,
        );
        if let Some(score) = self.score {
            line.push_str(&format!(" | Score: {}", score));
        }
        line.push_str(&format!(
            " | IP: {} | Ref: {} | UA: {}",
            self.client_ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            if self.has_referer { "yes" } else { "no" },
            self.user_agent.as_deref().unwrap_or("empty"),
        ));
        line
    }
}

/// Discards every verdict.
#[derive(Debug, Default)]
pub struct NullSink;

impl VerdictSink for NullSink {
    fn record(&self, _signals: &RequestSignals, _verdict: &Verdict) {}

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Emits one structured tracing event per verdict.
#[derive(Debug)]
pub struct TracingSink {
    ua_max_chars: usize,
}

impl TracingSink {
    pub fn new(ua_max_chars: usize) -> Self {
        Self { ua_max_chars }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(VerdictLogConfig::default().ua_max_chars)
    }
}

impl VerdictSink for TracingSink {
    fn record(&self, signals: &RequestSignals, verdict: &Verdict) {
        let entry = LogEntry::new(signals, verdict, self.ua_max_chars);
        info!(
            target: "verdict_log",
            is_bot = entry.is_bot,
            reason = %entry.reason,
            score = ?entry.score,
            client_ip = ?entry.client_ip,
            referer = entry.has_referer,
            user_agent = entry.user_agent.as_deref().unwrap_or("empty"),
            "Verdict"
        );
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Appends lines to a file from a background task.
#[derive(Debug)]
pub struct FileSink {
    tx: mpsc::Sender<String>,
    ua_max_chars: usize,
}

impl FileSink {
    /// Open (creating if needed) the log file and spawn the writer task.
    ///
    /// Must be called from within a Tokio runtime. The writer exits once
    /// every sender is dropped; await the handle to flush pending lines.
    pub async fn open(
        path: &Path,
        queue_capacity: usize,
        ua_max_chars: usize,
    ) -> anyhow::Result<(Self, JoinHandle<()>)> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating log directory {}", dir.display()))?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening verdict log {}", path.display()))?;

        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let writer = tokio::spawn(write_lines(file, path.to_path_buf(), rx));

        Ok((Self { tx, ua_max_chars }, writer))
    }
}

impl VerdictSink for FileSink {
    fn record(&self, signals: &RequestSignals, verdict: &Verdict) {
        let line = LogEntry::new(signals, verdict, self.ua_max_chars).to_line();
        match self.tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(line)) => {
                warn!(target: "verdict_log", entry = %line, "Verdict log queue full");
            }
            Err(TrySendError::Closed(line)) => {
                warn!(target: "verdict_log", entry = %line, "Verdict log writer stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

async fn write_lines(mut file: tokio::fs::File, path: PathBuf, mut rx: mpsc::Receiver<String>) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!(
                target: "verdict_log",
                path = %path.display(),
                error = %e,
                entry = %line.trim_end(),
                "Cannot write verdict log"
            );
        }
    }
    if let Err(e) = file.flush().await {
        error!(target: "verdict_log", path = %path.display(), error = %e, "Cannot flush verdict log");
    }
}

/// Build the sink selected by configuration.
///
/// A file sink that cannot be opened degrades to the tracing sink.
pub async fn build_sink(config: &VerdictLogConfig) -> (Arc<dyn VerdictSink>, Option<JoinHandle<()>>) {
    match config.sink {
        SinkKind::None => (Arc::new(NullSink), None),
        SinkKind::Tracing => (Arc::new(TracingSink::new(config.ua_max_chars)), None),
        SinkKind::File => {
            match FileSink::open(&config.path, config.queue_capacity, config.ua_max_chars).await {
                Ok((sink, writer)) => (Arc::new(sink), Some(writer)),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Falling back to tracing verdict log");
                    (Arc::new(TracingSink::new(config.ua_max_chars)), None)
                }
            }
        }
    }
}
