//! Header scoring.
//!
//! Scores request headers for browser evidence:
//! - Presence of browser-characteristic headers
//! - Richness of Accept, Accept-Language and Accept-Encoding
//! - Consistency between the User-Agent and Client Hints

use super::{ScoreDelta, Scorer};
use crate::patterns::PatternSet;
use crate::signals::RequestSignals;

/// A browser-characteristic header and the labels for its presence or absence.
struct WeightedHeader {
    name: &'static str,
    weight: u32,
    present: &'static str,
    missing: &'static str,
}

const fn weighted(
    name: &'static str,
    weight: u32,
    present: &'static str,
    missing: &'static str,
) -> WeightedHeader {
    WeightedHeader {
        name,
        weight,
        present,
        missing,
    }
}

/// Headers real browsers send, with the weight of their presence.
const WEIGHTED_HEADERS: &[WeightedHeader] = &[
    weighted("accept", 18, "has_accept", "missing_accept"),
    weighted("accept-language", 15, "has_accept_language", "missing_accept_language"),
    weighted("accept-encoding", 12, "has_accept_encoding", "missing_accept_encoding"),
    weighted("sec-fetch-site", 20, "has_sec_fetch_site", "missing_sec_fetch_site"),
    weighted("sec-fetch-mode", 15, "has_sec_fetch_mode", "missing_sec_fetch_mode"),
    weighted("sec-fetch-dest", 12, "has_sec_fetch_dest", "missing_sec_fetch_dest"),
    weighted(
        "upgrade-insecure-requests",
        15,
        "has_upgrade_insecure_requests",
        "missing_upgrade_insecure_requests",
    ),
    weighted("sec-ch-ua", 18, "has_sec_ch_ua", "missing_sec_ch_ua"),
    weighted("sec-ch-ua-mobile", 10, "has_sec_ch_ua_mobile", "missing_sec_ch_ua_mobile"),
    weighted("dnt", 5, "has_dnt", "missing_dnt"),
    weighted("cache-control", 8, "has_cache_control", "missing_cache_control"),
    weighted("sec-fetch-user", 12, "has_sec_fetch_user", "missing_sec_fetch_user"),
];

/// Media types in a navigation Accept header.
const ACCEPT_TYPES: &[(&str, u32, &str)] = &[
    ("text/html", 15, "accept_text_html"),
    ("application/xhtml+xml", 12, "accept_xhtml"),
    ("image/webp", 10, "accept_webp"),
    ("image/avif", 8, "accept_avif"),
    ("image/apng", 6, "accept_apng"),
    ("application/signed-exchange", 5, "accept_signed_exchange"),
];

/// Bare language codes typical of hard-coded client defaults.
const BARE_LANGUAGES: &[&str] = &["en", "pt", "es", "fr", "de", "ja", "zh"];

/// Header scorer.
pub struct HeaderScorer {
    weights: &'static [WeightedHeader],
}

impl HeaderScorer {
    /// Create a new header scorer.
    pub fn new() -> Self {
        Self {
            weights: WEIGHTED_HEADERS,
        }
    }

    fn score_presence(&self, signals: &RequestSignals, delta: &mut ScoreDelta) {
        for header in self.weights {
            if signals.has_header(header.name) {
                delta.credit(header.weight, header.present);
            } else {
                delta.penalize(header.weight, header.missing);
            }
        }
    }
}

impl Default for HeaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for HeaderScorer {
    fn score(&self, signals: &RequestSignals, _patterns: &PatternSet) -> ScoreDelta {
        let mut delta = ScoreDelta::new();

        self.score_presence(signals, &mut delta);

        if let Some(accept) = signals.header("accept") {
            score_accept(accept, &mut delta);
        }
        if let Some(lang) = signals.header("accept-language") {
            score_accept_language(lang, &mut delta);
        }
        if let Some(encoding) = signals.header("accept-encoding") {
            score_accept_encoding(encoding, &mut delta);
        }
        if let Some(hints) = signals.header("sec-ch-ua") {
            score_client_hints(signals.user_agent(), hints, &mut delta);
        }

        delta
    }

    fn name(&self) -> &'static str {
        "header_scorer"
    }
}

fn score_accept(accept: &str, delta: &mut ScoreDelta) {
    if !accept.starts_with("text/html") {
        delta.penalize(25, "accept_not_html_first");
    }

    for (media_type, points, reason) in ACCEPT_TYPES {
        if accept.contains(media_type) {
            delta.credit(*points, *reason);
        }
    }

    if accept.contains("q=") {
        delta.credit(10, "accept_quality_values");
    }
}

fn score_accept_language(lang: &str, delta: &mut ScoreDelta) {
    if !lang.contains(',') && !lang.contains('-') {
        delta.penalize(20, "accept_language_single");
    }

    let trimmed = lang.trim();
    if BARE_LANGUAGES.iter().any(|code| trimmed.eq_ignore_ascii_case(code)) {
        delta.penalize(25, "accept_language_bare_code");
    }

    if lang.contains(',') {
        delta.credit(12, "accept_language_list");
    }
    if lang.contains("q=") {
        delta.credit(8, "accept_language_quality_values");
    }
}

fn score_accept_encoding(encoding: &str, delta: &mut ScoreDelta) {
    if !encoding.contains("gzip") {
        delta.penalize(20, "accept_encoding_no_gzip");
    }
    if encoding.contains("br") {
        delta.credit(8, "accept_encoding_brotli");
    }
    if encoding.contains("deflate") {
        delta.credit(5, "accept_encoding_deflate");
    }
}

/// Cross-check the engine claimed by the User-Agent against Sec-CH-UA.
fn score_client_hints(ua: &str, hints: &str, delta: &mut ScoreDelta) {
    let ua = ua.to_lowercase();
    let hints = hints.to_lowercase();

    if hints.contains("headless") {
        delta.penalize(100, "client_hints_headless");
    }

    let ua_chromium = ua.contains("chrome") || ua.contains("chromium");
    let hints_chromium = hints.contains("chrome") || hints.contains("chromium");
    if ua_chromium != hints_chromium {
        delta.penalize(35, "client_hints_chromium_mismatch");
    } else if ua_chromium {
        delta.credit(15, "client_hints_chromium_match");
    }

    // Only the literal "edge" token counts, so a Chromium Edge UA ("Edg/")
    // disagrees with a "Microsoft Edge" brand
    let ua_edge = ua.contains("edge");
    let hints_edge = hints.contains("edge");
    if ua_edge != hints_edge {
        delta.penalize(30, "client_hints_edge_mismatch");
    }
}

/// Score the request headers, returning the human/penalty delta.
pub fn score_headers(signals: &RequestSignals, patterns: &PatternSet) -> ScoreDelta {
    HeaderScorer::new().score(signals, patterns)
}
