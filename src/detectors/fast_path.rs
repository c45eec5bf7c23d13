//! Fast-path filters.
//!
//! Cheap, ordered checks that settle clear-cut requests before scoring:
//! - Execution context (cron, CLI, same-site AJAX)
//! - Automation tool markers
//! - Known good and bad User-Agent signatures
//! - Missing or non-browser Accept headers

use crate::config::UserAgentLimits;
use crate::patterns::PatternSet;
use crate::score::Verdict;
use crate::signals::RequestSignals;
use std::fmt;

/// Headers set by browser automation frameworks.
const AUTOMATION_HEADERS: &[&str] = &[
    "x-automation",
    "x-selenium",
    "x-webdriver",
    "webdriver",
    "x-puppeteer",
    "x-playwright",
];

/// Headers every mainstream browser sends on navigation.
const REQUIRED_HEADERS: &[&str] = &["accept", "accept-language", "accept-encoding"];

/// Accept values sent by HTTP libraries, never by a browser navigating.
const FORBIDDEN_ACCEPTS: &[&str] = &["*/*", "application/json", "text/plain", "text/*", "image/*"];

/// The rule that settled a request on the fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastPathRule {
    SystemContext,
    AjaxWithoutReferer,
    AutomationHeader(&'static str),
    UserAgentLength(usize),
    WordPressTool,
    SocialPreview,
    KnownBot,
    SuspiciousUserAgent,
    NonGetMethod(String),
    MissingHeader(&'static str),
    ConnectionClose,
    ForbiddenAccept(String),
    SimpleAccept,
}

impl FastPathRule {
    /// Whether the rule flags the request as automated.
    pub fn is_bot(&self) -> bool {
        !matches!(self, FastPathRule::WordPressTool | FastPathRule::SocialPreview)
    }
}

impl fmt::Display for FastPathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastPathRule::SystemContext => write!(f, "System context"),
            FastPathRule::AjaxWithoutReferer => write!(f, "AJAX no referer"),
            FastPathRule::AutomationHeader(h) => write!(f, "Automation header: {}", h),
            FastPathRule::UserAgentLength(len) => write!(f, "Invalid UA length: {}", len),
            FastPathRule::WordPressTool => write!(f, "WordPress tool"),
            FastPathRule::SocialPreview => write!(f, "Social bot"),
            FastPathRule::KnownBot => write!(f, "Known bot"),
            FastPathRule::SuspiciousUserAgent => write!(f, "Suspicious pattern"),
            FastPathRule::NonGetMethod(m) => write!(f, "Non-GET method: {}", m),
            FastPathRule::MissingHeader(h) => write!(f, "Missing required header: {}", h),
            FastPathRule::ConnectionClose => write!(f, "Suspicious header value: connection=close"),
            FastPathRule::ForbiddenAccept(a) => write!(f, "Forbidden accept: {}", a),
            FastPathRule::SimpleAccept => write!(f, "Too simple accept header"),
        }
    }
}

/// Find the first fast-path rule that applies, in precedence order.
pub fn check(
    signals: &RequestSignals,
    patterns: &PatternSet,
    limits: &UserAgentLimits,
) -> Option<FastPathRule> {
    if signals.is_system_context() {
        return Some(FastPathRule::SystemContext);
    }

    if signals.is_ajax() && (!signals.has_header("referer") || !signals.referer_host_match()) {
        return Some(FastPathRule::AjaxWithoutReferer);
    }

    if let Some(header) = AUTOMATION_HEADERS
        .iter()
        .copied()
        .find(|h| signals.has_header(h))
    {
        return Some(FastPathRule::AutomationHeader(header));
    }

    let ua = signals.user_agent();
    let ua_len = ua.chars().count();
    if !limits.accepts(ua_len) {
        return Some(FastPathRule::UserAgentLength(ua_len));
    }

    if patterns.wordpress.is_match(ua) {
        return Some(FastPathRule::WordPressTool);
    }

    let ua_lower = ua.to_lowercase();
    if patterns.social.is_match(&ua_lower) {
        return Some(FastPathRule::SocialPreview);
    }

    if patterns.is_known_bot(&ua_lower) {
        return Some(FastPathRule::KnownBot);
    }
    if patterns.suspicious.is_match(&ua_lower) {
        return Some(FastPathRule::SuspiciousUserAgent);
    }

    if signals.method() != "GET" {
        return Some(FastPathRule::NonGetMethod(signals.method().to_string()));
    }

    if let Some(header) = REQUIRED_HEADERS
        .iter()
        .copied()
        .find(|h| !signals.has_header(h))
    {
        return Some(FastPathRule::MissingHeader(header));
    }

    if signals.header("connection") == Some("close") {
        return Some(FastPathRule::ConnectionClose);
    }

    // Presence checked above
    let accept = signals.header("accept").unwrap_or_default();
    if FORBIDDEN_ACCEPTS.contains(&accept.trim()) {
        return Some(FastPathRule::ForbiddenAccept(accept.trim().to_string()));
    }
    if accept.matches(',').count() < 2 {
        return Some(FastPathRule::SimpleAccept);
    }

    None
}

/// Run the fast path, returning a definitive verdict or `None` to fall
/// through to scoring.
pub fn fast_path(
    signals: &RequestSignals,
    patterns: &PatternSet,
    limits: &UserAgentLimits,
) -> Option<Verdict> {
    check(signals, patterns, limits).map(Verdict::from_rule)
}
