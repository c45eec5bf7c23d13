//! Bot/human classification for tracked redirect hits.
//!
//! Decides whether a hit on a tracked redirect should count as a genuine
//! human click. Classification is a pure, synchronous function of the
//! request snapshot and an immutable pattern set: no I/O, no shared mutable
//! state.
//!
//! # Features
//!
//! - Ordered fast-path filters (execution context, automation headers,
//!   known good and bad signatures, mandatory headers)
//! - Header scoring with User-Agent / Client Hint cross-checks
//! - User-Agent structure scoring
//! - Signature-dependent decision thresholds
//! - Optional non-blocking verdict log
//!
//! # Example
//!
//! ```
//! use redirect_bot_filter::{BotClassifier, RequestSignals};
//!
//! let classifier = BotClassifier::with_defaults();
//! let signals = RequestSignals::builder()
//!     .user_agent("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)")
//!     .build();
//!
//! assert!(classifier.classify(&signals).is_bot);
//! ```

pub mod classifier;
pub mod config;
pub mod detectors;
pub mod patterns;
pub mod score;
pub mod signals;
pub mod verdict_log;

pub use classifier::BotClassifier;
pub use config::ClassifierConfig;
pub use detectors::{fast_path, score_headers, score_user_agent};
pub use patterns::{get_patterns, PatternSet};
pub use score::{decide, ScoreAccumulator, ScoreTrace, Verdict};
pub use signals::{RequestSignals, RequestSnapshot};
