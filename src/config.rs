//! Configuration types for the redirect bot classifier.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Score thresholds for the final decision
    pub thresholds: ThresholdConfig,

    /// User-Agent length bounds for the fast path
    pub limits: UserAgentLimits,

    /// Extra signatures on top of the built-in pattern set
    pub patterns: PatternConfig,

    /// Operational verdict log
    pub verdict_log: VerdictLogConfig,
}

impl ClassifierConfig {
    /// Load configuration from a JSON or YAML file.
    ///
    /// YAML is used when the extension is `yaml` or `yml`, JSON otherwise.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let config = if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            serde_yaml::from_str(&content)
                .with_context(|| format!("parsing YAML config {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON config {}", path.display()))?
        };

        Ok(config)
    }
}

/// Score thresholds for the decision engine.
///
/// All comparisons are strict: a final score equal to a threshold passes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Minimum final score when the UA carries a browser signature
    pub browser_threshold: i64,

    /// Minimum final score when it does not
    pub default_threshold: i64,

    /// Secondary bar applied to browser-signature requests
    pub browser_floor: i64,
}

impl ThresholdConfig {
    /// Threshold for the given browser-signature flag.
    pub fn for_signature(&self, has_browser_signature: bool) -> i64 {
        if has_browser_signature {
            self.browser_threshold
        } else {
            self.default_threshold
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            browser_threshold: 50,
            default_threshold: 85,
            browser_floor: 70,
        }
    }
}

/// Accepted User-Agent length range, in characters (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentLimits {
    pub min_length: usize,
    pub max_length: usize,
}

impl UserAgentLimits {
    /// Returns true if `len` lies within the accepted range.
    pub fn accepts(&self, len: usize) -> bool {
        len >= self.min_length && len <= self.max_length
    }
}

impl Default for UserAgentLimits {
    fn default() -> Self {
        Self {
            min_length: 15,
            max_length: 2000,
        }
    }
}

/// Pattern set extensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Additional bot signatures (regular expressions, matched
    /// case-insensitively against the User-Agent)
    pub custom_bot_patterns: Vec<String>,
}

/// Where verdicts are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Verdicts are not logged
    #[default]
    None,
    /// One structured tracing event per verdict
    Tracing,
    /// Append lines to a log file
    File,
}

/// Verdict log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictLogConfig {
    /// Sink type
    pub sink: SinkKind,

    /// Log file path (file sink only)
    pub path: PathBuf,

    /// Pending entries kept before new ones are diverted to the fallback
    pub queue_capacity: usize,

    /// User-Agent characters written per line
    pub ua_max_chars: usize,
}

impl Default for VerdictLogConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::None,
            path: PathBuf::from("bot-detection.log"),
            queue_capacity: 1024,
            ua_max_chars: 120,
        }
    }
}
