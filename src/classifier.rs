//! Redirect bot classifier.

use crate::config::ClassifierConfig;
use crate::detectors::{fast_path, HeaderScorer, Scorer, UserAgentScorer};
use crate::patterns::{get_patterns, PatternSet};
use crate::score::{decide, ScoreAccumulator, Verdict};
use crate::signals::RequestSignals;
use crate::verdict_log::{build_sink, NullSink, VerdictSink};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Classifies redirect hits as human clicks or automated traffic.
///
/// Holds only immutable state, so one instance can be shared across
/// request handlers.
pub struct BotClassifier {
    /// Configuration
    config: ClassifierConfig,
    /// Compiled signatures
    patterns: Arc<PatternSet>,
    /// Scorers run after the fast path
    scorers: Vec<Box<dyn Scorer>>,
    /// Verdict log
    sink: Arc<dyn VerdictSink>,
    /// Background writer of the file sink, if any
    log_writer: Option<JoinHandle<()>>,
}

impl BotClassifier {
    /// Create a classifier from explicit parts, without a verdict log.
    pub fn new(config: ClassifierConfig, patterns: Arc<PatternSet>) -> Self {
        Self {
            config,
            patterns,
            scorers: vec![
                Box::new(HeaderScorer::new()),
                Box::new(UserAgentScorer::new()),
            ],
            sink: Arc::new(NullSink),
            log_writer: None,
        }
    }

    /// Create with default configuration and the built-in pattern set.
    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default(), Arc::new(get_patterns().clone()))
    }

    /// Create from configuration: compiles custom patterns and opens the
    /// configured verdict log. Must be called within a Tokio runtime.
    pub async fn from_config(config: ClassifierConfig) -> anyhow::Result<Self> {
        let patterns = Arc::new(PatternSet::compile(&config.patterns)?);
        let (sink, log_writer) = build_sink(&config.verdict_log).await;
        info!(
            sink = sink.name(),
            custom_patterns = patterns.custom_bots.len(),
            "Classifier ready"
        );

        let mut classifier = Self::new(config, patterns);
        classifier.sink = sink;
        classifier.log_writer = log_writer;
        Ok(classifier)
    }

    /// Replace the verdict log.
    pub fn with_sink(mut self, sink: Arc<dyn VerdictSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Classify a request and record the verdict.
    pub fn classify(&self, signals: &RequestSignals) -> Verdict {
        let verdict = self.evaluate(signals);
        self.sink.record(signals, &verdict);
        verdict
    }

    /// Classify a request without touching the verdict log.
    pub fn evaluate(&self, signals: &RequestSignals) -> Verdict {
        if let Some(verdict) = fast_path(signals, &self.patterns, &self.config.limits) {
            debug!(
                is_bot = verdict.is_bot,
                reason = %verdict.reason,
                "Fast path verdict"
            );
            return verdict;
        }

        let mut scores = ScoreAccumulator::new();
        for scorer in &self.scorers {
            let delta = scorer.score(signals, &self.patterns);
            debug!(
                detector = scorer.name(),
                human = delta.human,
                penalty = delta.penalty,
                "Scoring complete"
            );
            scores.add(delta);
        }

        let has_browser_signature = self.patterns.has_browser_signature(signals.user_agent());
        let verdict = decide(None, scores, has_browser_signature, &self.config.thresholds);

        debug!(
            is_bot = verdict.is_bot,
            final_score = ?verdict.final_score,
            threshold = ?verdict.threshold_used,
            reason = %verdict.reason,
            "Scored verdict"
        );

        verdict
    }

    /// Drop the verdict log and wait for pending lines to be written.
    pub async fn shutdown(self) {
        let Self {
            sink, log_writer, ..
        } = self;
        drop(sink);
        if let Some(writer) = log_writer {
            if let Err(e) = writer.await {
                debug!(error = %e, "Verdict log writer ended abnormally");
            }
        }
    }
}
