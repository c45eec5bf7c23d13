//! Bot detection stages.
//!
//! The fast path yields an immediate verdict for clear-cut requests; the
//! scorers each return a human/penalty delta that the decision engine sums.

pub mod fast_path;
pub mod headers;
pub mod user_agent;

pub use fast_path::{fast_path, FastPathRule};
pub use headers::{score_headers, HeaderScorer};
pub use user_agent::{score_user_agent, UserAgentScorer};

use crate::patterns::PatternSet;
use crate::signals::RequestSignals;
use std::ops::AddAssign;

/// Score contribution from a single scorer. Points saturate at `u32::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreDelta {
    /// Evidence for a genuine browser
    pub human: u32,
    /// Evidence against
    pub penalty: u32,
    /// Labels for each rule that fired
    pub reasons: Vec<&'static str>,
}

impl ScoreDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the human score.
    pub fn credit(&mut self, points: u32, reason: &'static str) {
        self.human = self.human.saturating_add(points);
        self.reasons.push(reason);
    }

    /// Add to the penalty score.
    pub fn penalize(&mut self, points: u32, reason: &'static str) {
        self.penalty = self.penalty.saturating_add(points);
        self.reasons.push(reason);
    }

    /// The `(human, penalty)` pair.
    pub fn pair(&self) -> (u32, u32) {
        (self.human, self.penalty)
    }
}

impl AddAssign for ScoreDelta {
    fn add_assign(&mut self, other: Self) {
        self.human = self.human.saturating_add(other.human);
        self.penalty = self.penalty.saturating_add(other.penalty);
        self.reasons.extend(other.reasons);
    }
}

/// Trait for request scorers.
///
/// Scorers are pure: the delta depends only on the request and the pattern
/// set, and scorers can run in any order.
pub trait Scorer: Send + Sync {
    /// Score the request.
    fn score(&self, signals: &RequestSignals, patterns: &PatternSet) -> ScoreDelta;

    /// Get the scorer name.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_accumulates() {
        let mut delta = ScoreDelta::new();
        delta.credit(10, "a");
        delta.penalize(5, "b");
        delta.credit(3, "c");
        assert_eq!(delta.pair(), (13, 5));
        assert_eq!(delta.reasons, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_delta_add_assign() {
        let mut total = ScoreDelta::new();
        total.credit(10, "a");

        let mut other = ScoreDelta::new();
        other.penalize(7, "b");

        total += other;
        assert_eq!(total.pair(), (10, 7));
        assert_eq!(total.reasons, vec!["a", "b"]);
    }

    #[test]
    fn test_delta_saturates() {
        let mut delta = ScoreDelta::new();
        delta.credit(u32::MAX, "a");
        delta.credit(1, "b");
        delta.penalize(u32::MAX, "c");
        delta.penalize(1, "d");
        assert_eq!(delta.pair(), (u32::MAX, u32::MAX));

        let mut other = ScoreDelta::new();
        other.credit(5, "e");
        delta += other;
        assert_eq!(delta.human, u32::MAX);
    }
}
