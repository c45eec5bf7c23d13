//! User-Agent scoring.
//!
//! Scores the structure of the User-Agent string:
//! - Browser engine signature and platform block
//! - Length and browser token count
//! - Chrome version plausibility
//! - Operating system token

use super::{ScoreDelta, Scorer};
use crate::patterns::PatternSet;
use crate::signals::RequestSignals;

/// Browser tokens; real UAs carry several of these.
const BROWSER_TOKENS: &[&str] = &["mozilla", "webkit", "chrome", "safari", "firefox", "edge"];

/// Operating system tokens.
const OS_TOKENS: &[&str] = &["windows", "macintosh", "linux", "android", "iphone", "ipad"];

/// User-Agent scorer.
pub struct UserAgentScorer {
    /// Plausible Chrome major versions (inclusive)
    chrome_versions: (u32, u32),
    /// Chrome versions at or above this are credited as current
    current_chrome: u32,
}

impl UserAgentScorer {
    /// Create a new User-Agent scorer.
    pub fn new() -> Self {
        Self {
            chrome_versions: (100, 130),
            current_chrome: 120,
        }
    }

    fn score_chrome_version(&self, version: u32, delta: &mut ScoreDelta) {
        let (min, max) = self.chrome_versions;
        if version < min || version > max {
            delta.penalize(25, "implausible_chrome_version");
        }
        if version >= self.current_chrome {
            delta.credit(8, "current_chrome_version");
        }
    }
}

impl Default for UserAgentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for UserAgentScorer {
    fn score(&self, signals: &RequestSignals, patterns: &PatternSet) -> ScoreDelta {
        let ua = signals.user_agent();
        let ua_lower = ua.to_lowercase();
        let mut delta = ScoreDelta::new();

        if patterns.has_browser_signature(ua) {
            delta.credit(20, "browser_signature");
            if ua_lower.contains("mozilla") && ua_lower.contains("webkit") {
                delta.credit(10, "mozilla_webkit");
            }
        } else {
            delta.penalize(40, "no_browser_signature");
        }

        if !patterns.parentheses.is_match(ua) {
            delta.penalize(20, "no_platform_block");
        }

        let len = ua.chars().count();
        if len < 60 {
            delta.penalize(25, "short_user_agent");
        }
        if len > 1000 {
            delta.penalize(15, "long_user_agent");
        }

        let tokens = BROWSER_TOKENS
            .iter()
            .filter(|token| ua_lower.contains(*token))
            .count();
        if tokens < 2 {
            delta.penalize(30, "few_browser_tokens");
        }

        if ua_lower.contains("chrome") {
            if let Some(version) = patterns.chrome_version(ua) {
                self.score_chrome_version(version, &mut delta);
            }
        }

        if OS_TOKENS.iter().any(|os| ua_lower.contains(os)) {
            delta.credit(8, "os_token");
        } else {
            delta.penalize(20, "no_os_token");
        }

        delta
    }

    fn name(&self) -> &'static str {
        "user_agent_scorer"
    }
}

/// Score the User-Agent string, returning the human/penalty delta.
pub fn score_user_agent(signals: &RequestSignals, patterns: &PatternSet) -> ScoreDelta {
    UserAgentScorer::new().score(signals, patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::get_patterns;

    fn score(ua: &str) -> ScoreDelta {
        let signals = RequestSignals::builder().user_agent(ua).build();
        score_user_agent(&signals, get_patterns())
    }

    #[test]
    fn test_modern_chrome() {
        let delta = score("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36");
        // signature 20 + 10, current chrome 8, os 8
        assert_eq!(delta.pair(), (46, 0));
    }

    #[test]
    fn test_firefox() {
        let delta = score("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0");
        assert_eq!(delta.pair(), (28, 0));
    }

    #[test]
    fn test_outdated_chrome() {
        let delta = score("Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36");
        assert_eq!(delta.pair(), (38, 25));
        assert!(delta.reasons.contains(&"implausible_chrome_version"));
    }

    #[test]
    fn test_future_chrome() {
        let delta = score("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36");
        assert_eq!(delta.pair(), (46, 25));
    }

    #[test]
    fn test_bare_tool() {
        let delta = score("my-fetcher-tool v1");
        // no signature 40, no platform 20, short 25, tokens 30, no os 20
        assert_eq!(delta.pair(), (0, 135));
    }

    #[test]
    fn test_long_user_agent() {
        let ua = format!(
            "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/122.0.0.0 Safari/537.36 {}",
            "x".repeat(1000)
        );
        let delta = score(&ua);
        assert!(delta.reasons.contains(&"long_user_agent"));
        assert_eq!(delta.penalty, 15);
    }

    fn chrome(version: u32) -> String {
        format!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
            version
        )
    }

    /// Windows Firefox UA padded to exactly `len` chars.
    fn firefox_of_len(len: usize) -> String {
        let prefix = "Mozilla/5.0 (Windows NT 10.0; ";
        let suffix = ") Firefox/121.0";
        let ua = format!(
            "{}{}{}",
            prefix,
            "x".repeat(len - prefix.len() - suffix.len()),
            suffix
        );
        assert_eq!(ua.chars().count(), len);
        ua
    }

    #[test]
    fn test_chrome_version_window() {
        // window [100, 130] inclusive, credit from 120
        assert_eq!(score(&chrome(99)).pair(), (38, 25));
        assert_eq!(score(&chrome(100)).pair(), (38, 0));
        assert_eq!(score(&chrome(119)).pair(), (38, 0));
        assert_eq!(score(&chrome(120)).pair(), (46, 0));
        assert_eq!(score(&chrome(130)).pair(), (46, 0));
        assert_eq!(score(&chrome(131)).pair(), (46, 25));
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(score(&firefox_of_len(59)).pair(), (28, 25));
        assert_eq!(score(&firefox_of_len(60)).pair(), (28, 0));
        assert_eq!(score(&firefox_of_len(1000)).pair(), (28, 0));
        assert_eq!(score(&firefox_of_len(1001)).pair(), (28, 15));
    }

    #[test]
    fn test_scorer_name() {
        assert_eq!(UserAgentScorer::new().name(), "user_agent_scorer");
    }
}
