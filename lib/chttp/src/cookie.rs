//! Cookie storage.
//!
//! A client configured with a [`CookieJar`] stores the `Set-Cookie` headers of
//! every response (redirect hops included) and attaches a `Cookie` header to
//! every request whose URL matches stored cookies.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use cookie::Cookie;
use http::HeaderValue;
use url::Url;

/// Storage for cookies shared by the requests of a client.
pub trait CookieJar: Send + Sync + 'static {
    /// Store the `Set-Cookie` values received from `url`.
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url);

    /// The `Cookie` header value to send to `url`, if any cookie matches.
    fn cookies(&self, url: &Url) -> Option<HeaderValue>;
}

/// In-memory [`CookieJar`].
///
/// Matching follows the usual browser rules: host-only or domain cookies,
/// path prefix on segment boundaries, `Secure` cookies only over https.
/// Expiry is honoured for `Max-Age=0` (and negative), which removes the cookie.
#[derive(Default)]
pub struct MemoryJar {
    store: Mutex<Vec<StoredCookie>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    host_only: bool,
    path: String,
    secure: bool,
}

impl StoredCookie {
    fn from_set_cookie(cookie: &Cookie<'_>, url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();

        let (domain, host_only) = match cookie.domain() {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                // a server may only set cookies for itself or a parent domain
                if !domain_matches(&host, &domain) {
                    return None;
                }
                (domain, false)
            }
            None => (host, true),
        };

        let path = match cookie.path() {
            Some(path) if path.starts_with('/') => path.to_owned(),
            _ => default_path(url.path()),
        };

        Some(Self {
            name: cookie.name().to_owned(),
            value: cookie.value().to_owned(),
            domain,
            host_only,
            path,
            secure: cookie.secure().unwrap_or(false),
        })
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };

        domain_ok && path_matches(url.path(), &self.path) && (!self.secure || url.scheme() == "https")
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

impl MemoryJar {
    /// An empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` when no cookie is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MemoryJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryJar").field("len", &self.len()).finish()
    }
}

impl CookieJar for MemoryJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            let Ok(cookie) = Cookie::parse(raw) else {
                continue;
            };
            let Some(stored) = StoredCookie::from_set_cookie(&cookie, url) else {
                continue;
            };

            store.retain(|existing| !existing.same_slot(&stored));
            let expired = cookie
                .max_age()
                .is_some_and(|age| age.is_zero() || age.is_negative());
            if !expired {
                store.push(stored);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        let mut matching: Vec<&StoredCookie> = store.iter().filter(|c| c.matches(url)).collect();
        if matching.is_empty() {
            return None;
        }
        // longer paths first
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        let header = matching
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::try_from(header).ok()
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path
                .get(cookie_path.len()..)
                .is_some_and(|rest| rest.starts_with('/')))
}

fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(index) => request_path.get(..index).unwrap_or("/").to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    fn set(jar: &MemoryJar, url: &Url, values: &[&'static str]) {
        let headers: Vec<_> = values.iter().map(|v| HeaderValue::from_static(*v)).collect();
        jar.set_cookies(&mut headers.iter(), url);
    }

    fn sent(jar: &MemoryJar, raw: &str) -> Option<String> {
        jar.cookies(&url(raw))
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    #[test]
    fn host_only_cookie_is_not_sent_to_subdomain() {
        let jar = MemoryJar::new();
        set(&jar, &url("http://example.com/login"), &["session=abc"]);

        assert_eq!(sent(&jar, "http://example.com/"), Some("session=abc".to_owned()));
        assert_eq!(sent(&jar, "http://api.example.com/"), None);
        assert_eq!(sent(&jar, "http://other.com/"), None);
    }

    #[test]
    fn domain_cookie_is_sent_to_subdomains() {
        let jar = MemoryJar::new();
        set(&jar, &url("http://www.example.com/"), &["id=1; Domain=example.com"]);

        assert_eq!(sent(&jar, "http://api.example.com/"), Some("id=1".to_owned()));
        assert_eq!(sent(&jar, "http://notexample.com/"), None);
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let jar = MemoryJar::new();
        set(&jar, &url("http://example.com/"), &["id=1; Domain=other.com"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn path_and_secure_rules() {
        let jar = MemoryJar::new();
        set(
            &jar,
            &url("https://example.com/"),
            &["a=1; Path=/api", "b=2; Path=/; Secure"],
        );

        assert_eq!(sent(&jar, "https://example.com/api/pets"), Some("a=1; b=2".to_owned()));
        assert_eq!(sent(&jar, "https://example.com/apiary"), Some("b=2".to_owned()));
        assert_eq!(sent(&jar, "http://example.com/api"), Some("a=1".to_owned()));
    }

    #[test]
    fn same_slot_is_replaced_and_max_age_zero_removes() {
        let jar = MemoryJar::new();
        let origin = url("http://example.com/");
        set(&jar, &origin, &["token=old"]);
        set(&jar, &origin, &["token=new"]);
        assert_eq!(sent(&jar, "http://example.com/"), Some("token=new".to_owned()));
        assert_eq!(jar.len(), 1);

        set(&jar, &origin, &["token=gone; Max-Age=0"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn default_path_is_directory_of_request() {
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path("/login"), "/");
        assert_eq!(default_path("/api/v1/login"), "/api/v1");
        assert_eq!(default_path(""), "/");
    }
}
