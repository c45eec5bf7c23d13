//! Score accumulation and the final decision.

use crate::config::ThresholdConfig;
use crate::detectors::{FastPathRule, ScoreDelta};
use serde::{Deserialize, Serialize};

/// Human and penalty totals for one classification.
///
/// Both totals only ever increase.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    human_score: u32,
    penalty_score: u32,
    reasons: Vec<&'static str>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a scorer's delta.
    pub fn add(&mut self, delta: ScoreDelta) {
        self.human_score = self.human_score.saturating_add(delta.human);
        self.penalty_score = self.penalty_score.saturating_add(delta.penalty);
        self.reasons.extend(delta.reasons);
    }

    pub fn human_score(&self) -> u32 {
        self.human_score
    }

    pub fn penalty_score(&self) -> u32 {
        self.penalty_score
    }

    /// `human - penalty`; may be negative.
    pub fn final_score(&self) -> i64 {
        i64::from(self.human_score) - i64::from(self.penalty_score)
    }

    fn into_trace(self, has_browser_signature: bool) -> ScoreTrace {
        ScoreTrace {
            human_score: self.human_score,
            penalty_score: self.penalty_score,
            has_browser_signature,
            reasons: self.reasons.into_iter().map(String::from).collect(),
        }
    }
}

/// Diagnostic breakdown of a scored verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTrace {
    pub human_score: u32,
    pub penalty_score: u32,
    pub has_browser_signature: bool,
    /// Labels of the scoring rules that fired
    pub reasons: Vec<String>,
}

/// Classification result.
///
/// `reason`, `final_score` and `trace` are diagnostic only; callers gate on
/// `is_bot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Likely an automated agent
    pub is_bot: bool,

    /// Why the verdict was reached
    pub reason: String,

    /// Human minus penalty score, when scoring ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i64>,

    /// Threshold the score was compared against, when scoring ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_used: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ScoreTrace>,
}

impl Verdict {
    /// Verdict flagging an automated agent.
    pub fn bot(reason: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            reason: reason.into(),
            final_score: None,
            threshold_used: None,
            trace: None,
        }
    }

    /// Verdict letting the request count as a click.
    pub fn human(reason: impl Into<String>) -> Self {
        Self {
            is_bot: false,
            ..Self::bot(reason)
        }
    }

    /// Verdict for a fast-path rule.
    pub fn from_rule(rule: FastPathRule) -> Self {
        if rule.is_bot() {
            Self::bot(rule.to_string())
        } else {
            Self::human(rule.to_string())
        }
    }

    fn with_score(mut self, final_score: i64, threshold: i64, trace: ScoreTrace) -> Self {
        self.final_score = Some(final_score);
        self.threshold_used = Some(threshold);
        self.trace = Some(trace);
        self
    }
}

/// Combine the fast-path result and scores into the final verdict.
///
/// A fast-path verdict wins unchanged. Otherwise the final score must reach
/// the signature-dependent threshold, and browser-signature requests must
/// also reach the browser floor. Comparisons are strict, so ties pass.
pub fn decide(
    fast_path: Option<Verdict>,
    scores: ScoreAccumulator,
    has_browser_signature: bool,
    thresholds: &ThresholdConfig,
) -> Verdict {
    if let Some(verdict) = fast_path {
        return verdict;
    }

    let final_score = scores.final_score();
    let threshold = thresholds.for_signature(has_browser_signature);
    let trace = scores.into_trace(has_browser_signature);

    let verdict = if final_score < threshold {
        Verdict::bot("Failed score threshold")
    } else if has_browser_signature && final_score < thresholds.browser_floor {
        Verdict::bot("Low score despite browser signature")
    } else {
        Verdict::human("Verified human")
    };

    verdict.with_score(final_score, threshold, trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(human: u32, penalty: u32) -> ScoreAccumulator {
        let mut acc = ScoreAccumulator::new();
        acc.add(ScoreDelta {
            human,
            penalty,
            reasons: vec![],
        });
        acc
    }

    #[test]
    fn test_accumulator_final_score() {
        let mut acc = scores(40, 100);
        assert_eq!(acc.final_score(), -60);

        let mut delta = ScoreDelta::new();
        delta.credit(80, "x");
        acc.add(delta);
        assert_eq!(acc.human_score(), 120);
        assert_eq!(acc.penalty_score(), 100);
        assert_eq!(acc.final_score(), 20);
    }

    #[test]
    fn test_fast_path_wins() {
        let verdict = decide(
            Some(Verdict::human("WordPress tool")),
            scores(0, 500),
            false,
            &ThresholdConfig::default(),
        );
        assert!(!verdict.is_bot);
        assert_eq!(verdict.reason, "WordPress tool");
        assert!(verdict.final_score.is_none());
        assert!(verdict.trace.is_none());
    }

    #[test]
    fn test_threshold_without_signature() {
        let t = ThresholdConfig::default();

        let verdict = decide(None, scores(184, 100), false, &t);
        assert!(verdict.is_bot);
        assert_eq!(verdict.final_score, Some(84));
        assert_eq!(verdict.threshold_used, Some(85));

        // ties pass
        let verdict = decide(None, scores(185, 100), false, &t);
        assert!(!verdict.is_bot);
        assert_eq!(verdict.reason, "Verified human");
    }

    #[test]
    fn test_browser_floor() {
        let t = ThresholdConfig::default();

        let verdict = decide(None, scores(49, 0), true, &t);
        assert!(verdict.is_bot);
        assert_eq!(verdict.reason, "Failed score threshold");
        assert_eq!(verdict.threshold_used, Some(50));

        let verdict = decide(None, scores(69, 0), true, &t);
        assert!(verdict.is_bot);
        assert_eq!(verdict.reason, "Low score despite browser signature");

        let verdict = decide(None, scores(70, 0), true, &t);
        assert!(!verdict.is_bot);
        let trace = verdict.trace.unwrap();
        assert_eq!(trace.human_score, 70);
        assert!(trace.has_browser_signature);
    }

    #[test]
    fn test_verdict_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&Verdict::bot("Known bot")).unwrap();
        assert_eq!(json, r#"{"is_bot":true,"reason":"Known bot"}"#);
    }

    #[test]
    fn test_from_rule() {
        assert!(Verdict::from_rule(FastPathRule::KnownBot).is_bot);
        let social = Verdict::from_rule(FastPathRule::SocialPreview);
        assert!(!social.is_bot);
        assert_eq!(social.reason, "Social bot");
    }
}
