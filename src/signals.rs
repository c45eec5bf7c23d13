//! Request snapshot handed to the classifier.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use url::Url;

/// Immutable description of one inbound request.
///
/// Header names are stored lowercase; when a header is supplied more than
/// once, the first value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignals {
    method: String,
    headers: HashMap<String, String>,
    user_agent: String,
    is_system_context: bool,
    is_ajax: bool,
    referer_host_match: bool,
    client_ip: Option<IpAddr>,
}

impl RequestSignals {
    /// Start building a GET request snapshot.
    pub fn builder() -> RequestSignalsBuilder {
        RequestSignalsBuilder::default()
    }

    /// HTTP method as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Returns true if the header is present, even with an empty value.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// User-Agent string; empty when the header is absent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// CLI, cron or admin-API invocation rather than a browser hit.
    pub fn is_system_context(&self) -> bool {
        self.is_system_context
    }

    pub fn is_ajax(&self) -> bool {
        self.is_ajax
    }

    /// Whether the Referer points at the requested host.
    pub fn referer_host_match(&self) -> bool {
        self.referer_host_match
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }
}

/// Builder for [`RequestSignals`].
#[derive(Debug, Clone, Default)]
pub struct RequestSignalsBuilder {
    method: Option<String>,
    headers: HashMap<String, String>,
    is_system_context: bool,
    is_ajax: bool,
    referer_host_match: Option<bool>,
    client_ip: Option<IpAddr>,
}

impl RequestSignalsBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header. Later values for the same name are ignored.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    /// Add several headers in order.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name.as_ref(), value);
        }
        self
    }

    pub fn user_agent(self, ua: impl Into<String>) -> Self {
        self.header("user-agent", ua)
    }

    pub fn system_context(mut self, yes: bool) -> Self {
        self.is_system_context = yes;
        self
    }

    pub fn ajax(mut self, yes: bool) -> Self {
        self.is_ajax = yes;
        self
    }

    /// Override the Referer/Host comparison computed by [`build`](Self::build).
    pub fn referer_host_match(mut self, yes: bool) -> Self {
        self.referer_host_match = Some(yes);
        self
    }

    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn build(self) -> RequestSignals {
        let referer_host_match = self.referer_host_match.unwrap_or_else(|| {
            match (self.headers.get("referer"), self.headers.get("host")) {
                (Some(referer), Some(host)) => referer_matches_host(referer, host),
                _ => false,
            }
        });

        let user_agent = self.headers.get("user-agent").cloned().unwrap_or_default();

        RequestSignals {
            method: self
                .method
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GET".to_string()),
            headers: self.headers,
            user_agent,
            is_system_context: self.is_system_context,
            is_ajax: self.is_ajax,
            referer_host_match,
            client_ip: self.client_ip,
        }
    }
}

/// Compare the Referer URL host with the Host header, ignoring port and case.
fn referer_matches_host(referer: &str, host: &str) -> bool {
    let Ok(url) = Url::parse(referer) else {
        return false;
    };
    let Some(referer_host) = url.host_str() else {
        return false;
    };
    referer_host.eq_ignore_ascii_case(strip_port(host.trim()))
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// Header list in either object or `[name, value]` pair form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotHeaders {
    Pairs(Vec<(String, String)>),
    Map(BTreeMap<String, String>),
}

impl Default for SnapshotHeaders {
    fn default() -> Self {
        Self::Pairs(Vec::new())
    }
}

/// Serialized request snapshot, as replayed by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSnapshot {
    pub method: Option<String>,
    pub headers: SnapshotHeaders,
    pub is_system_context: bool,
    pub is_ajax: bool,
    pub referer_host_match: Option<bool>,
    pub client_ip: Option<IpAddr>,
}

impl RequestSnapshot {
    pub fn into_signals(self) -> RequestSignals {
        let mut builder = RequestSignals::builder()
            .system_context(self.is_system_context)
            .ajax(self.is_ajax);

        if let Some(method) = self.method {
            builder = builder.method(method);
        }
        builder = match self.headers {
            SnapshotHeaders::Pairs(pairs) => builder.headers(pairs),
            SnapshotHeaders::Map(map) => builder.headers(map),
        };
        if let Some(matched) = self.referer_host_match {
            builder = builder.referer_host_match(matched);
        }
        if let Some(ip) = self.client_ip {
            builder = builder.client_ip(ip);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let signals = RequestSignals::builder()
            .header("Accept-Language", "en-US")
            .build();
        assert_eq!(signals.header("accept-language"), Some("en-US"));
        assert_eq!(signals.header("ACCEPT-LANGUAGE"), Some("en-US"));
        assert!(signals.has_header("Accept-Language"));
        assert!(!signals.has_header("accept"));
    }

    #[test]
    fn test_first_value_wins() {
        let signals = RequestSignals::builder()
            .header("Accept", "text/html")
            .header("accept", "*/*")
            .build();
        assert_eq!(signals.header("accept"), Some("text/html"));
    }

    #[test]
    fn test_user_agent_from_header() {
        let signals = RequestSignals::builder().user_agent("Mozilla/5.0").build();
        assert_eq!(signals.user_agent(), "Mozilla/5.0");
        assert_eq!(signals.header("user-agent"), Some("Mozilla/5.0"));

        let empty = RequestSignals::builder().build();
        assert_eq!(empty.user_agent(), "");
    }

    #[test]
    fn test_method_defaults_to_get() {
        assert_eq!(RequestSignals::builder().build().method(), "GET");
        assert_eq!(RequestSignals::builder().method("").build().method(), "GET");
        assert_eq!(RequestSignals::builder().method("POST").build().method(), "POST");
    }

    #[test]
    fn test_referer_host_match_derived() {
        let matched = RequestSignals::builder()
            .header("Referer", "https://Example.com/blog/post")
            .header("Host", "example.com:8443")
            .build();
        assert!(matched.referer_host_match());

        let foreign = RequestSignals::builder()
            .header("Referer", "https://evil.test/?q=example.com")
            .header("Host", "example.com")
            .build();
        assert!(!foreign.referer_host_match());

        let no_referer = RequestSignals::builder().header("Host", "example.com").build();
        assert!(!no_referer.referer_host_match());
    }

    #[test]
    fn test_referer_host_match_override() {
        let signals = RequestSignals::builder()
            .header("Referer", "https://evil.test/")
            .header("Host", "example.com")
            .referer_host_match(true)
            .build();
        assert!(signals.referer_host_match());
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }

    #[test]
    fn test_snapshot_object_headers() {
        let json = r#"{
            "method": "GET",
            "headers": {"User-Agent": "curl/8.1", "Accept": "*/*"},
            "client_ip": "203.0.113.7"
        }"#;
        let snapshot: RequestSnapshot = serde_json::from_str(json).unwrap();
        let signals = snapshot.into_signals();
        assert_eq!(signals.user_agent(), "curl/8.1");
        assert_eq!(signals.header("accept"), Some("*/*"));
        assert_eq!(signals.client_ip(), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_snapshot_pair_headers() {
        let json = r#"{
            "headers": [["Accept", "text/html"], ["accept", "*/*"]],
            "is_ajax": true
        }"#;
        let snapshot: RequestSnapshot = serde_json::from_str(json).unwrap();
        let signals = snapshot.into_signals();
        assert_eq!(signals.method(), "GET");
        assert_eq!(signals.header("accept"), Some("text/html"));
        assert!(signals.is_ajax());
        assert!(!signals.is_system_context());
    }
}
