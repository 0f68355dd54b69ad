//! §4.2 SessionJar — HTTP cookie jar with per-cookie lifetime & eviction.
//!
//! Storage is a sequence of [`SetCookieCall`] records rather than a
//! canonical per-host map, so that the exact raw `Set-Cookie` strings
//! survive round-trips through `session.json` (grounded on the teacher's
//! `common::CookieJar`, generalized per spec.md §4.2's explicit rationale).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// One observed response that carried `Set-Cookie` headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCookieCall {
    pub request_url: Url,
    pub set_cookie_headers: Vec<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionJar {
    calls: Vec<SetCookieCall>,
}

/// A single cookie, as scoped by RFC 6265 §4.1.2 attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    /// Parses a single raw `Set-Cookie` header value.
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        if name.trim().is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            domain: None,
            path: None,
            expires: None,
        };

        let mut max_age: Option<i64> = None;
        for attr in parts {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }
            let (attr_name, attr_value) = attr.split_once('=').unwrap_or((attr, ""));
            match attr_name.trim().to_ascii_lowercase().as_str() {
                "domain" => {
                    let v = attr_value.trim().trim_start_matches('.');
                    if !v.is_empty() {
                        cookie.domain = Some(v.to_ascii_lowercase());
                    }
                }
                "path" => {
                    if !attr_value.trim().is_empty() {
                        cookie.path = Some(attr_value.trim().to_string());
                    }
                }
                "expires" => {
                    if let Ok(naive) =
                        NaiveDateTime::parse_from_str(attr_value.trim(), "%a, %d %b %Y %H:%M:%S GMT")
                    {
                        cookie.expires = Some(naive.and_utc());
                    } else if let Ok(naive) = NaiveDateTime::parse_from_str(
                        attr_value.trim(),
                        "%a, %d-%b-%Y %H:%M:%S GMT",
                    ) {
                        cookie.expires = Some(naive.and_utc());
                    }
                }
                "max-age" => {
                    max_age = attr_value.trim().parse::<i64>().ok();
                }
                _ => {}
            }
        }

        // Max-Age takes precedence over Expires (RFC 6265 §5.3 step 3).
        if let Some(secs) = max_age {
            cookie.expires = Some(Utc::now() + chrono::Duration::seconds(secs));
        }

        Some(cookie)
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|exp| exp <= now).unwrap_or(false)
    }

    fn domain_matches(&self, host: &str) -> bool {
        match &self.domain {
            None => true,
            Some(d) => host.eq_ignore_ascii_case(d) || host.to_ascii_lowercase().ends_with(&format!(".{d}")),
        }
    }

    fn path_matches(&self, path: &str) -> bool {
        match &self.path {
            None => true,
            Some(p) => path == p || path.starts_with(&format!("{}/", p.trim_end_matches('/'))) || p == "/",
        }
    }

    fn scope_key(&self, default_host: &str) -> (String, String, String) {
        (
            self.name.clone(),
            self.domain.clone().unwrap_or_else(|| default_host.to_string()),
            self.path.clone().unwrap_or_else(|| "/".to_string()),
        )
    }

    pub fn as_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl SessionJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record if the response carried any `Set-Cookie` headers.
    pub fn record(&mut self, url: &Url, set_cookie_headers: &[String], now: DateTime<Utc>) {
        if set_cookie_headers.is_empty() {
            return;
        }
        self.calls.push(SetCookieCall {
            request_url: url.clone(),
            set_cookie_headers: set_cookie_headers.to_vec(),
            received_at: now,
        });
    }

    /// Drops records older than `lifetime` relative to `now`. A
    /// non-positive lifetime is coerced to 24h.
    pub fn evict_older_than(&mut self, lifetime: Duration, now: DateTime<Utc>) {
        let lifetime = if lifetime.is_zero() {
            Duration::from_secs(24 * 3600)
        } else {
            lifetime
        };
        let lifetime = chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::hours(24));
        self.calls
            .retain(|call| now.signed_duration_since(call.received_at) <= lifetime);
    }

    /// Number of recorded calls currently held (post-eviction, if eviction
    /// has already been run).
    pub fn total_cookie_sets(&self) -> usize {
        self.calls.len()
    }

    /// Raw records, for persistence.
    pub fn calls_snapshot(&self) -> Vec<SetCookieCall> {
        self.calls.clone()
    }

    /// Synthesizes the cookies that apply to an outgoing request to `url`,
    /// applying RFC 6265 domain/path scoping and expiry, latest-wins per
    /// `(name, domain, path)` scope.
    pub fn cookies_for(&self, url: &Url, now: DateTime<Utc>) -> Vec<Cookie> {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let req_path = if url.path().is_empty() { "/" } else { url.path() };

        let mut scoped: indexmap::IndexMap<(String, String, String), Cookie> = indexmap::IndexMap::new();
        for call in &self.calls {
            let call_host = call.request_url.host_str().unwrap_or("").to_ascii_lowercase();
            for raw in &call.set_cookie_headers {
                let Some(cookie) = Cookie::parse(raw) else {
                    continue;
                };
                if cookie.expired(now) {
                    let key = cookie.scope_key(&call_host);
                    scoped.shift_remove(&key);
                    continue;
                }
                if !cookie.domain_matches(&host) || !cookie.path_matches(req_path) {
                    continue;
                }
                let key = cookie.scope_key(&call_host);
                scoped.insert(key, cookie);
            }
        }
        scoped.into_values().collect()
    }

    /// Renders the `Cookie` header value for an outgoing request, or `None`
    /// if there is nothing to send.
    pub fn cookie_header(&self, url: &Url, now: DateTime<Utc>) -> Option<String> {
        let cookies = self.cookies_for(url, now);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(Cookie::as_pair)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn records_and_replays_a_simple_cookie() {
        let mut jar = SessionJar::new();
        let url = Url::from_str("https://api.example.com/auth").unwrap();
        let now = Utc::now();
        jar.record(&url, &["session=s1; Path=/".to_string()], now);

        let dest = Url::from_str("https://api.example.com/me").unwrap();
        assert_eq!(jar.cookie_header(&dest, now), Some("session=s1".to_string()));
    }

    #[test]
    fn domain_scoping_excludes_other_hosts() {
        let mut jar = SessionJar::new();
        let url = Url::from_str("https://api.example.com/auth").unwrap();
        let now = Utc::now();
        jar.record(
            &url,
            &["session=s1; Domain=api.example.com".to_string()],
            now,
        );

        let other = Url::from_str("https://other.example.com/me").unwrap();
        assert_eq!(jar.cookie_header(&other, now), None);
    }

    #[test]
    fn eviction_is_monotonic() {
        let mut jar = SessionJar::new();
        let url = Url::from_str("https://api.example.com/auth").unwrap();
        let received_at = Utc::now() - chrono::Duration::hours(2);
        jar.record(&url, &["a=b".to_string()], received_at);

        let now = Utc::now();
        jar.evict_older_than(Duration::from_secs(3600), now);
        assert_eq!(jar.total_cookie_sets(), 0);
    }

    #[test]
    fn zero_lifetime_is_coerced_to_24h() {
        let mut jar = SessionJar::new();
        let url = Url::from_str("https://api.example.com/auth").unwrap();
        let received_at = Utc::now() - chrono::Duration::hours(2);
        jar.record(&url, &["a=b".to_string()], received_at);

        jar.evict_older_than(Duration::from_secs(0), Utc::now());
        assert_eq!(jar.total_cookie_sets(), 1);
    }

    #[test]
    fn max_age_takes_precedence_over_expires() {
        let cookie = Cookie::parse(
            "a=b; Expires=Wed, 01 Jan 2099 00:00:00 GMT; Max-Age=-1",
        )
        .unwrap();
        assert!(cookie.expired(Utc::now()));
    }
}
