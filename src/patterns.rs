//! Pattern registry.
//!
//! Compiled matchers for known bot, browser and suspicious User-Agent
//! signatures. The built-in set is compiled once on first use and shared
//! read-only for the life of the process; alternate sets can be compiled
//! from a [`PatternConfig`] and injected into the classifier.

use crate::config::PatternConfig;
use anyhow::Context;
use regex::Regex;
use std::sync::LazyLock;

/// First-party tooling that is always let through.
const WORDPRESS: &str = r"(?i)^(wordpress|jetpack|wp-rocket|wp-optimize|wp-cron)/";

/// Social networks and messengers fetching link previews.
const SOCIAL: &str = r"(?i)\b(whatsapp|facebookexternalhit|facebookcatalog|facebot|instagram|discordbot|linkedinbot|twitterbot|pinterest|skypeuripreview|slackbot-linkexpanding|telegrambot|redditbot|vkshare|line|kakaotalk|wechat)\b";

/// Mainstream browser engine tokens.
const BROWSER: &str =
    r"(?i)\b(mozilla.*webkit|chrome/[\d.]+|firefox/[\d.]+|safari/[\d.]+|edge/[\d.]+|opera/[\d.]+)\b";

/// Automation vocabulary, bare `name/version` agents and library tokens.
const SUSPICIOUS: &str = r"(?i)\b(headless|automation|webdriver|test|check|scan|monitor)\b|^[a-z]+/[\d.]+$|\b(api|sdk|client|lib)\s*[\d.]*$";

const CHROME_VERSION: &str = r"(?i)chrome/(\d+)";

const PARENTHESES: &str = r"\([^)]+\)";

/// Crawlers, scrapers, HTTP libraries, browser automation and LLM agents.
const BOT_MEGA: &str = concat!(
    r"(?i)\b(",
    // search engines
    r"googlebot|bingbot|yandexbot|baiduspider|slurp|duckduckbot|applebot|seznam|nutch|petalbot|sogou|exabot",
    // LLM agents
    r"|gptbot|claude-web|openai|anthropic-ai|perplexity|ccbot|bytespider|chatgpt-user|bard|gemini-pro",
    // HTTP clients
    r"|python-requests|python-urllib|go-http-client|node-fetch|axios|guzzle|httpclient|postman|insomnia|httpie",
    // browser automation
    r"|selenium|puppeteer|playwright|phantomjs|headlesschrome|webdriver|chromedriver|cypress|scrapy",
    // SEO and monitoring
    r"|ahrefs|semrush|mj12bot|screaming frog|moz\.com|pingdom|uptimerobot|statuscake",
    r")\b"
);

static DEFAULT_PATTERNS: LazyLock<PatternSet> = LazyLock::new(PatternSet::builtin);

/// Returns the process-wide built-in pattern set, compiling it on first use.
pub fn get_patterns() -> &'static PatternSet {
    &DEFAULT_PATTERNS
}

/// Named collection of compiled matchers.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub wordpress: Regex,
    pub social: Regex,
    pub browser: Regex,
    pub suspicious: Regex,
    pub chrome_version: Regex,
    pub parentheses: Regex,
    pub bot_mega: Regex,
    /// Operator-supplied bot signatures
    pub custom_bots: Vec<Regex>,
}

impl PatternSet {
    /// Compile the built-in matchers.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile.
    fn builtin() -> Self {
        Self {
            wordpress: Regex::new(WORDPRESS).expect("valid regex: wordpress"),
            social: Regex::new(SOCIAL).expect("valid regex: social"),
            browser: Regex::new(BROWSER).expect("valid regex: browser"),
            suspicious: Regex::new(SUSPICIOUS).expect("valid regex: suspicious"),
            chrome_version: Regex::new(CHROME_VERSION).expect("valid regex: chrome_version"),
            parentheses: Regex::new(PARENTHESES).expect("valid regex: parentheses"),
            bot_mega: Regex::new(BOT_MEGA).expect("valid regex: bot_mega"),
            custom_bots: Vec::new(),
        }
    }

    /// Build a pattern set from configuration: the built-in matchers plus any
    /// custom bot patterns.
    pub fn compile(config: &PatternConfig) -> anyhow::Result<Self> {
        let mut set = get_patterns().clone();
        for pattern in &config.custom_bot_patterns {
            let regex = Regex::new(&format!("(?i){}", pattern))
                .with_context(|| format!("invalid custom bot pattern {:?}", pattern))?;
            set.custom_bots.push(regex);
        }
        Ok(set)
    }

    /// Returns true if the UA carries a mainstream browser signature.
    pub fn has_browser_signature(&self, ua: &str) -> bool {
        self.browser.is_match(ua)
    }

    /// Returns true if the UA matches the known-bot list or a custom pattern.
    pub fn is_known_bot(&self, ua: &str) -> bool {
        self.bot_mega.is_match(ua) || self.custom_bots.iter().any(|p| p.is_match(ua))
    }

    /// Extract the Chrome major version, if present and numeric.
    pub fn chrome_version(&self, ua: &str) -> Option<u32> {
        self.chrome_version
            .captures(ua)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

    #[test]
    fn test_wordpress_prefix() {
        let p = get_patterns();
        assert!(p.wordpress.is_match("WordPress/6.4; https://example.com"));
        assert!(p.wordpress.is_match("wp-cron/1.0"));
        assert!(!p.wordpress.is_match("Mozilla/5.0 wordpress/6.4"));
    }

    #[test]
    fn test_social_tokens() {
        let p = get_patterns();
        assert!(p.social.is_match("whatsapp/2.23.20.0 a"));
        assert!(p.social.is_match("facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)"));
        assert!(!p.social.is_match(&CHROME_UA.to_lowercase()));
    }

    #[test]
    fn test_browser_signature() {
        let p = get_patterns();
        assert!(p.has_browser_signature(CHROME_UA));
        assert!(p.has_browser_signature("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"));
        assert!(!p.has_browser_signature("curl/8.1.2"));
    }

    #[test]
    fn test_suspicious_patterns() {
        let p = get_patterns();
        assert!(p.suspicious.is_match("curl/8.1"));
        assert!(p.suspicious.is_match("Mozilla/5.0 (X11) HeadlessThing automation"));
        assert!(p.suspicious.is_match("my uptime monitor v2"));
        assert!(p.suspicious.is_match("acme-payments sdk 2.1"));
        assert!(!p.suspicious.is_match(CHROME_UA));
    }

    #[test]
    fn test_bot_mega() {
        let p = get_patterns();
        assert!(p.is_known_bot("mozilla/5.0 (compatible; googlebot/2.1; +http://www.google.com/bot.html)"));
        assert!(p.is_known_bot("python-requests/2.31.0"));
        assert!(p.is_known_bot("mozilla/5.0 applewebkit/537.36 (khtml, like gecko; compatible; gptbot/1.0)"));
        assert!(p.is_known_bot("screaming frog seo spider/19.0"));
        assert!(!p.is_known_bot(&CHROME_UA.to_lowercase()));
    }

    #[test]
    fn test_chrome_version_extraction() {
        let p = get_patterns();
        assert_eq!(p.chrome_version(CHROME_UA), Some(122));
        assert_eq!(p.chrome_version("Mozilla/5.0 chrome/89"), Some(89));
        assert_eq!(p.chrome_version("Mozilla/5.0 Firefox/120"), None);
        assert_eq!(p.chrome_version("Chrome/99999999999999"), None);
    }

    #[test]
    fn test_parentheses() {
        let p = get_patterns();
        assert!(p.parentheses.is_match(CHROME_UA));
        assert!(!p.parentheses.is_match("Mozilla/5.0 ()"));
    }

    #[test]
    fn test_lazy_init_is_idempotent() {
        let first = get_patterns();
        let second = get_patterns();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.bot_mega.as_str(), second.bot_mega.as_str());
        assert_eq!(
            first.has_browser_signature(CHROME_UA),
            second.has_browser_signature(CHROME_UA)
        );
    }

    #[test]
    fn test_compile_custom_patterns() {
        let config = PatternConfig {
            custom_bot_patterns: vec![r"acme-?crawler".to_string()],
        };
        let set = PatternSet::compile(&config).unwrap();
        assert!(set.is_known_bot("ACMECrawler/3.0 (+https://acme.test)"));
        assert!(!get_patterns().is_known_bot("acmecrawler/3.0"));
    }

    #[test]
    fn test_compile_rejects_invalid_pattern() {
        let config = PatternConfig {
            custom_bot_patterns: vec!["(unclosed".to_string()],
        };
        let err = PatternSet::compile(&config).unwrap_err();
        assert!(err.to_string().contains("invalid custom bot pattern"));
    }
}
